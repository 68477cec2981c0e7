//! The flat catalogue of atomic permissions.
//!
//! Each permission owns exactly one bit. Bits are allocated append-only: a new
//! permission takes the next unused bit and no existing value ever moves,
//! because masks computed from these values are compared across releases.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u32 {
        const TASK_READ       = 1 << 0;
        const TASK_CREATE     = 1 << 1;
        const TASK_UPDATE     = 1 << 2;
        const TASK_DELETE     = 1 << 3;
        const TASK_ASSIGN     = 1 << 4;

        const CATEGORY_READ   = 1 << 5;
        const CATEGORY_CREATE = 1 << 6;
        const CATEGORY_UPDATE = 1 << 7;
        const CATEGORY_DELETE = 1 << 8;

        const USER_READ       = 1 << 9;
        const USER_CREATE     = 1 << 10;
        const USER_UPDATE     = 1 << 11;
        const USER_DELETE     = 1 << 12;

        const ADMIN           = 1 << 13;
    }
}

impl Permissions {
    /// Names of every permission set in this mask, lowest bit first.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
