// SPDX-License-Identifier: MIT OR Apache-2.0
//! Owner / grantee / public access control for one session.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{AuditCheckpoint, AuditKey, AuditLog};
use crate::{AccessError, AccessKind, Identity, Permission, Result};

/// Serialized [`AccessControl`] plus the audit checkpoint taken with it.
///
/// The checkpoint travels beside the bytes so a restore can tell a log cut
/// short at the tail from the one that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSnapshot {
    pub bytes: Vec<u8>,
    pub checkpoint: AuditCheckpoint,
}

/// Permission set plus audit log.
///
/// The owner always has full access and is never stored in `allowed` or
/// `read_only`. Only the owner may change permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Identity,
    allowed: BTreeSet<Identity>,
    read_only: BTreeSet<Identity>,
    is_public: bool,
    log_owner_access: bool,
    log: AuditLog,
    #[serde(skip)]
    audit_key: Option<AuditKey>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl AccessControl {
    pub fn new(owner: impl Into<Identity>) -> Self {
        Self {
            owner: owner.into(),
            allowed: BTreeSet::new(),
            read_only: BTreeSet::new(),
            is_public: false,
            log_owner_access: true,
            log: AuditLog::new(),
            audit_key: None,
        }
    }

    /// Key the audit chain. Must be the key the existing entries were
    /// written under, or [`AccessControl::verify`] fails.
    pub fn with_audit_key(mut self, key: Option<AuditKey>) -> Self {
        self.audit_key = key;
        self
    }

    pub fn is_keyed(&self) -> bool {
        self.audit_key.is_some()
    }

    /// Whether owner accesses are written to the log (default: true).
    pub fn with_owner_logging(mut self, enabled: bool) -> Self {
        self.log_owner_access = enabled;
        self
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn is_owner(&self, principal: &Identity) -> bool {
        &self.owner == principal
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn allowed(&self) -> &BTreeSet<Identity> {
        &self.allowed
    }

    pub fn read_only(&self) -> &BTreeSet<Identity> {
        &self.read_only
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// Explicit grant held by `principal`; `None` for the owner and strangers.
    pub fn permission_of(&self, principal: &Identity) -> Option<Permission> {
        if self.allowed.contains(principal) {
            Some(Permission::Write)
        } else if self.read_only.contains(principal) {
            Some(Permission::Read)
        } else {
            None
        }
    }

    /// Would `check` succeed? Does not log.
    pub fn permits(&self, principal: &Identity, kind: AccessKind) -> bool {
        if self.is_owner(principal) {
            return true;
        }
        if kind == AccessKind::Read && self.is_public {
            return true;
        }
        self.permission_of(principal)
            .is_some_and(|permission| permission.allows(kind))
    }

    /// Gate one access, stamped with the current wall clock.
    ///
    /// # Errors
    /// `Denied` if `principal` may not perform `kind`.
    pub fn check(&mut self, principal: &Identity, kind: AccessKind) -> Result<()> {
        self.check_at(principal, kind, now_millis())
    }

    /// Gate one access at an explicit timestamp (unix millis).
    ///
    /// Successful accesses are logged (the owner's only when owner logging
    /// is on); denied attempts leave the log untouched.
    ///
    /// # Errors
    /// `Denied` if `principal` may not perform `kind`.
    pub fn check_at(&mut self, principal: &Identity, kind: AccessKind, timestamp: u64) -> Result<()> {
        if !self.permits(principal, kind) {
            warn!(principal = %principal, kind = %kind, "access denied");
            return Err(AccessError::Denied {
                principal: principal.clone(),
                kind,
            });
        }

        if !self.is_owner(principal) || self.log_owner_access {
            self.log
                .append(self.audit_key.as_ref(), principal, kind, timestamp)?;
        }
        Ok(())
    }

    /// Grant `permission` to `principal`, replacing any earlier grant.
    ///
    /// # Errors
    /// `NotOwner` unless `by` is the owner; `OwnerImplicit` when granting to
    /// the owner.
    pub fn grant(&mut self, by: &Identity, principal: Identity, permission: Permission) -> Result<()> {
        self.require_owner(by)?;
        if self.is_owner(&principal) {
            return Err(AccessError::OwnerImplicit);
        }

        debug!(principal = %principal, permission = %permission, "grant");
        match permission {
            Permission::Write => {
                self.read_only.remove(&principal);
                self.allowed.insert(principal);
            },
            Permission::Read => {
                self.allowed.remove(&principal);
                self.read_only.insert(principal);
            },
        }
        Ok(())
    }

    /// Remove any grant held by `principal`. Returns whether one existed.
    ///
    /// # Errors
    /// `NotOwner` unless `by` is the owner.
    pub fn revoke(&mut self, by: &Identity, principal: &Identity) -> Result<bool> {
        self.require_owner(by)?;
        let removed = self.allowed.remove(principal) | self.read_only.remove(principal);
        debug!(principal = %principal, removed, "revoke");
        Ok(removed)
    }

    /// # Errors
    /// `NotOwner` unless `by` is the owner.
    pub fn set_public(&mut self, by: &Identity, public: bool) -> Result<()> {
        self.require_owner(by)?;
        self.is_public = public;
        Ok(())
    }

    /// Check structural invariants and the audit chain, e.g. on a snapshot
    /// handed back by a ledger reader.
    ///
    /// # Errors
    /// `OwnerImplicit` if the owner appears in a grant set, `TamperedLog` if
    /// the audit chain does not verify.
    pub fn verify(&self) -> Result<()> {
        if self.allowed.contains(&self.owner) || self.read_only.contains(&self.owner) {
            return Err(AccessError::OwnerImplicit);
        }
        self.log.verify(self.audit_key.as_ref())
    }

    /// # Errors
    /// `Snapshot` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| AccessError::Snapshot(e.to_string()))
    }

    /// Decode bytes produced by [`AccessControl::to_bytes`] and verify the
    /// chain under `key`. The key itself is never part of the bytes.
    ///
    /// # Errors
    /// `Snapshot` for undecodable bytes, otherwise as [`AccessControl::verify`].
    pub fn from_bytes(bytes: &[u8], key: Option<AuditKey>) -> Result<Self> {
        let access: Self =
            bincode::deserialize(bytes).map_err(|e| AccessError::Snapshot(e.to_string()))?;
        let access = access.with_audit_key(key);
        access.verify()?;
        Ok(access)
    }

    /// Bytes plus the current audit checkpoint, for persisting.
    ///
    /// # Errors
    /// `Snapshot` if serialization fails.
    pub fn snapshot(&self) -> Result<AccessSnapshot> {
        Ok(AccessSnapshot {
            bytes: self.to_bytes()?,
            checkpoint: self.log.checkpoint(),
        })
    }

    /// Inverse of [`AccessControl::snapshot`]: decode, verify the chain and
    /// check the log still reaches the stored checkpoint.
    ///
    /// # Errors
    /// As [`AccessControl::from_bytes`], or `TamperedLog` if the log was
    /// truncated or its head replaced.
    pub fn restore(snapshot: &AccessSnapshot, key: Option<AuditKey>) -> Result<Self> {
        let access = Self::from_bytes(&snapshot.bytes, key)?;
        access.log.verify_checkpoint(&snapshot.checkpoint)?;
        Ok(access)
    }

    fn require_owner(&self, by: &Identity) -> Result<()> {
        if self.is_owner(by) {
            Ok(())
        } else {
            Err(AccessError::NotOwner(by.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::from(name)
    }

    const ALL_KINDS: [AccessKind; 3] = [AccessKind::Read, AccessKind::Write, AccessKind::Delete];

    fn scenario() -> AccessControl {
        let mut acl = AccessControl::new("A");
        acl.grant(&id("A"), id("B"), Permission::Write).unwrap();
        acl
    }

    #[test]
    fn test_stranger_denied_and_log_unchanged() {
        let mut acl = scenario();
        let err = acl.check_at(&id("C"), AccessKind::Read, 10).unwrap_err();
        assert_eq!(
            err,
            AccessError::Denied {
                principal: id("C"),
                kind: AccessKind::Read
            }
        );
        assert!(acl.log().is_empty());
    }

    #[test]
    fn test_strangers_denied_every_kind_when_private() {
        let mut acl = scenario();
        acl.grant(&id("A"), id("R"), Permission::Read).unwrap();
        for stranger in ["C", "D", "", "a"] {
            for kind in ALL_KINDS {
                assert!(acl.check_at(&id(stranger), kind, 1).is_err());
            }
        }
        assert!(acl.log().is_empty());
    }

    #[test]
    fn test_public_read_for_anyone() {
        let mut acl = scenario();
        acl.set_public(&id("A"), true).unwrap();
        for principal in ["A", "B", "C", "Z"] {
            acl.check_at(&id(principal), AccessKind::Read, 5).unwrap();
        }
        // Public does not extend to writes.
        assert!(acl.check_at(&id("C"), AccessKind::Write, 5).is_err());
        assert_eq!(acl.log().len(), 4);
    }

    #[test]
    fn test_allowed_reads_and_writes_but_not_deletes() {
        let mut acl = scenario();
        acl.check_at(&id("B"), AccessKind::Read, 1).unwrap();
        acl.check_at(&id("B"), AccessKind::Write, 2).unwrap();
        assert!(acl.check_at(&id("B"), AccessKind::Delete, 3).is_err());
        assert_eq!(acl.log().len(), 2);
    }

    #[test]
    fn test_read_only_reads() {
        let mut acl = scenario();
        acl.grant(&id("A"), id("R"), Permission::Read).unwrap();
        acl.check_at(&id("R"), AccessKind::Read, 1).unwrap();
        assert!(acl.check_at(&id("R"), AccessKind::Write, 1).is_err());
    }

    #[test]
    fn test_owner_full_access_logged_by_default() {
        let mut acl = scenario();
        for kind in ALL_KINDS {
            acl.check_at(&id("A"), kind, 1).unwrap();
        }
        assert_eq!(acl.log().len(), 3);
        assert_eq!(acl.log().entries()[2].kind, AccessKind::Delete);
    }

    #[test]
    fn test_owner_logging_disabled() {
        let mut acl = AccessControl::new("A").with_owner_logging(false);
        acl.check_at(&id("A"), AccessKind::Write, 1).unwrap();
        assert!(acl.log().is_empty());
    }

    #[test]
    fn test_only_owner_changes_permissions() {
        let mut acl = scenario();
        assert_eq!(
            acl.grant(&id("B"), id("C"), Permission::Read),
            Err(AccessError::NotOwner(id("B")))
        );
        assert!(acl.revoke(&id("B"), &id("B")).is_err());
        assert!(acl.set_public(&id("B"), true).is_err());
        assert!(!acl.is_public());
    }

    #[test]
    fn test_owner_never_stored_in_sets() {
        let mut acl = scenario();
        assert_eq!(
            acl.grant(&id("A"), id("A"), Permission::Write),
            Err(AccessError::OwnerImplicit)
        );
        assert!(!acl.allowed().contains(&id("A")));
        assert!(acl.verify().is_ok());
    }

    #[test]
    fn test_grant_moves_between_sets() {
        let mut acl = scenario();
        acl.grant(&id("A"), id("B"), Permission::Read).unwrap();
        assert_eq!(acl.permission_of(&id("B")), Some(Permission::Read));
        assert!(acl.allowed().is_empty());

        assert!(acl.revoke(&id("A"), &id("B")).unwrap());
        assert!(!acl.revoke(&id("A"), &id("B")).unwrap());
        assert_eq!(acl.permission_of(&id("B")), None);
    }

    #[test]
    fn test_snapshot_roundtrip_verifies() {
        let mut acl = scenario();
        acl.check_at(&id("B"), AccessKind::Read, 42).unwrap();
        let bytes = acl.to_bytes().unwrap();
        let restored = AccessControl::from_bytes(&bytes, None).unwrap();
        assert_eq!(acl, restored);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            AccessControl::from_bytes(&[0xff; 4], None),
            Err(AccessError::Snapshot(_))
        ));
    }

    fn keyed_scenario() -> AccessControl {
        let mut acl = AccessControl::new("A").with_audit_key(Some(AuditKey::new([3; 32])));
        acl.set_public(&id("A"), true).unwrap();
        for (t, reader) in ["B", "C", "D"].into_iter().enumerate() {
            acl.check_at(&id(reader), AccessKind::Read, t as u64).unwrap();
        }
        acl
    }

    #[test]
    fn test_keyed_snapshot_restores_with_key() {
        let acl = keyed_scenario();
        let snapshot = acl.snapshot().unwrap();
        assert_eq!(snapshot.checkpoint.len, 3);

        let restored = AccessControl::restore(&snapshot, Some(AuditKey::new([3; 32]))).unwrap();
        assert!(restored.is_keyed());
        assert_eq!(restored, acl);

        assert_eq!(
            AccessControl::restore(&snapshot, None),
            Err(AccessError::TamperedLog { sequence: 0 })
        );
    }

    #[test]
    fn test_restore_rejects_truncated_log() {
        let acl = keyed_scenario();
        let snapshot = acl.snapshot().unwrap();

        // Same owner and grants, but only the first logged access.
        let mut first_only = AccessControl::new("A").with_audit_key(Some(AuditKey::new([3; 32])));
        first_only.set_public(&id("A"), true).unwrap();
        first_only.check_at(&id("B"), AccessKind::Read, 0).unwrap();
        assert_eq!(first_only.log().entries()[0], acl.log().entries()[0]);

        let truncated = AccessSnapshot {
            bytes: first_only.to_bytes().unwrap(),
            checkpoint: snapshot.checkpoint,
        };
        assert_eq!(
            AccessControl::restore(&truncated, Some(AuditKey::new([3; 32]))),
            Err(AccessError::TamperedLog { sequence: 1 })
        );
    }

    #[test]
    fn test_check_uses_wall_clock() {
        let mut acl = scenario();
        acl.check(&id("B"), AccessKind::Read).unwrap();
        assert!(acl.log().entries()[0].timestamp > 0);
    }
}
