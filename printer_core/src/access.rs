//! Access control over devices.
//!
//! Owners manage everything; friends may view and operate (fuel, collect,
//! upgrade) but never manage the friend list or remove the device.
//! Administrators are decided by the host's [`Permissions`] capability.

use crate::device::Device;
use printer_env::{ActorId, Permissions};

/// Owner or friend.
pub fn can_view(actor: ActorId, device: &Device) -> bool {
    actor == device.owner() || device.is_friend(actor)
}

/// Host-decided administrator override.
pub fn can_administer(actor: ActorId, permissions: &dyn Permissions) -> bool {
    permissions.is_admin(actor)
}

/// Only the owner may change who has access or remove the device.
pub fn can_mutate_ownership(actor: ActorId, device: &Device) -> bool {
    actor == device.owner()
}

/// Viewers plus administrators: the gate for fuel, collect and upgrade.
pub fn can_operate(actor: ActorId, device: &Device, permissions: &dyn Permissions) -> bool {
    can_view(actor, device) || can_administer(actor, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AdminIs(ActorId);

    impl Permissions for AdminIs {
        fn can_place(&self, _actor: ActorId) -> bool {
            true
        }
        fn has_tier_permission(&self, _actor: ActorId, _tier: u32) -> bool {
            true
        }
        fn is_admin(&self, actor: ActorId) -> bool {
            actor == self.0
        }
    }

    #[test]
    fn test_owner_and_friend_can_view() {
        let owner = ActorId::from_seed(1);
        let friend = ActorId::from_seed(2);
        let stranger = ActorId::from_seed(3);

        let mut device = Device::new(owner, 1);
        device.add_friend(friend);

        assert!(can_view(owner, &device));
        assert!(can_view(friend, &device));
        assert!(!can_view(stranger, &device));
    }

    #[test]
    fn test_only_owner_mutates_ownership() {
        let owner = ActorId::from_seed(1);
        let friend = ActorId::from_seed(2);
        let mut device = Device::new(owner, 1);
        device.add_friend(friend);

        assert!(can_mutate_ownership(owner, &device));
        assert!(!can_mutate_ownership(friend, &device));
    }

    #[test]
    fn test_admin_can_operate_any_device() {
        let admin = ActorId::from_seed(9);
        let perms = AdminIs(admin);
        let device = Device::new(ActorId::from_seed(1), 1);

        assert!(can_operate(admin, &device, &perms));
        assert!(!can_operate(ActorId::from_seed(3), &device, &perms));
        assert!(!can_mutate_ownership(admin, &device));
    }
}
