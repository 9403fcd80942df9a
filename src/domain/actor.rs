//! Authenticated actors and the order visibility policy.
//!
//! Identity itself comes from an external provider; the domain only cares
//! about who is acting and in what role. Visibility is a single policy,
//! applied uniformly by every order query, instead of per-endpoint filters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
    Moderator,
    WarehouseManager,
}

impl Role {
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "warehouse_manager" => Ok(Role::WarehouseManager),
            other => Err(Error::Validation(format!("unknown role: {other}"))),
        }
    }

    /// Admin and moderator can confirm orders and manage coupons.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    /// Stock records and restocking are warehouse/admin territory.
    pub fn can_manage_stock(self) -> bool {
        matches!(self, Role::Admin | Role::WarehouseManager)
    }

    /// Fulfilment transitions stamp the acting warehouse manager on the
    /// order; admins performing the same transition are not recorded.
    pub fn is_warehouse_manager(self) -> bool {
        matches!(self, Role::WarehouseManager)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

/// Which orders an actor may see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderVisibility {
    /// Admin and moderator see everything.
    All,
    /// Warehouse managers see only orders they can act on.
    StatusIn(&'static [OrderStatus]),
    /// Customers see only their own orders.
    CustomerOnly(Uuid),
}

pub const WAREHOUSE_VISIBLE: &[OrderStatus] = &[OrderStatus::Confirmed, OrderStatus::Processing];

impl OrderVisibility {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Admin | Role::Moderator => OrderVisibility::All,
            Role::WarehouseManager => OrderVisibility::StatusIn(WAREHOUSE_VISIBLE),
            Role::Customer => OrderVisibility::CustomerOnly(actor.id),
        }
    }

    /// Post-load check used by detail routes; list routes push the same
    /// predicate into SQL.
    pub fn allows(&self, order_customer_id: Uuid, status: OrderStatus) -> bool {
        match self {
            OrderVisibility::All => true,
            OrderVisibility::StatusIn(statuses) => statuses.contains(&status),
            OrderVisibility::CustomerOnly(id) => *id == order_customer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn admin_and_moderator_see_all() {
        for role in [Role::Admin, Role::Moderator] {
            assert_eq!(OrderVisibility::for_actor(&actor(role)), OrderVisibility::All);
        }
    }

    #[test]
    fn warehouse_manager_sees_actionable_statuses_only() {
        let v = OrderVisibility::for_actor(&actor(Role::WarehouseManager));
        let someone = Uuid::new_v4();
        assert!(v.allows(someone, OrderStatus::Confirmed));
        assert!(v.allows(someone, OrderStatus::Processing));
        assert!(!v.allows(someone, OrderStatus::Pending));
        assert!(!v.allows(someone, OrderStatus::Delivered));
    }

    #[test]
    fn only_warehouse_managers_are_recorded_on_fulfilment() {
        assert!(Role::WarehouseManager.is_warehouse_manager());
        for role in [Role::Customer, Role::Admin, Role::Moderator] {
            assert!(!role.is_warehouse_manager());
        }
    }

    #[test]
    fn customer_sees_only_own_orders() {
        let me = actor(Role::Customer);
        let v = OrderVisibility::for_actor(&me);
        assert!(v.allows(me.id, OrderStatus::Pending));
        assert!(!v.allows(Uuid::new_v4(), OrderStatus::Pending));
    }
}
