// SPDX-License-Identifier: MIT OR Apache-2.0
#![no_main]

use affect_vault::{AccessControl, AccessKind, Identity, Permission};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

const PRINCIPALS: [&str; 4] = ["owner", "alice", "bob", "carol"];

#[derive(Arbitrary, Debug, Clone, Copy)]
enum Kind {
    Read,
    Write,
    Delete,
}

impl From<Kind> for AccessKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Read => Self::Read,
            Kind::Write => Self::Write,
            Kind::Delete => Self::Delete,
        }
    }
}

#[derive(Arbitrary, Debug)]
enum AclOp {
    Check { who: u8, kind: Kind, at: u32 },
    Grant { by: u8, who: u8, write: bool },
    Revoke { by: u8, who: u8 },
    SetPublic { by: u8, public: bool },
}

fn principal(index: u8) -> Identity {
    Identity::from(PRINCIPALS[usize::from(index) % PRINCIPALS.len()])
}

fuzz_target!(|ops: Vec<AclOp>| {
    let mut acl = AccessControl::new("owner");

    for op in ops.iter().take(200) {
        match *op {
            AclOp::Check { who, kind, at } => {
                let who = principal(who);
                let kind = AccessKind::from(kind);
                let before = acl.log().len();
                let expected = acl.permits(&who, kind);
                let result = acl.check_at(&who, kind, u64::from(at));
                assert_eq!(result.is_ok(), expected);
                let grew = acl.log().len() - before;
                assert_eq!(grew, usize::from(expected), "denials must not be logged");
            },
            AclOp::Grant { by, who, write } => {
                let permission = if write { Permission::Write } else { Permission::Read };
                let _ = acl.grant(&principal(by), principal(who), permission);
            },
            AclOp::Revoke { by, who } => {
                let _ = acl.revoke(&principal(by), &principal(who));
            },
            AclOp::SetPublic { by, public } => {
                let _ = acl.set_public(&principal(by), public);
            },
        }
        assert!(!acl.allowed().contains(acl.owner()));
        assert!(!acl.read_only().contains(acl.owner()));
    }

    acl.verify().expect("chain must verify");
    let snapshot = acl.snapshot().expect("snapshot");
    assert_eq!(AccessControl::restore(&snapshot, None).expect("restore"), acl);
});
