//! Wire types for the pizza service API

use serde::{Deserialize, Serialize};

/// A pizza on the menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: u64,
    pub title: String,
    pub image: String,
    pub price: f64,
    pub description: String,
}

/// Franchise admin reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FranchiseAdmin {
    pub id: u64,
    pub name: String,
}

/// Store belonging to a franchise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: u64,
    pub name: String,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Franchise {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub admins: Vec<FranchiseAdmin>,
    #[serde(default)]
    pub stores: Vec<Store>,
}

/// Role tag attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Diner,
    Admin,
    Franchisee,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Diner => write!(f, "diner"),
            Role::Admin => write!(f, "admin"),
            Role::Franchisee => write!(f, "franchisee"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub roles: Vec<RoleAssignment>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }
}

/// Body returned by login and registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// PUT /api/auth body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_id: u64,
    pub description: String,
    pub price: f64,
}

/// POST /api/order body
///
/// The store id travels as a string (it comes straight from the store
/// `<select>`), the franchise id as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub store_id: String,
    pub franchise_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub items: Vec<OrderItem>,
    pub store_id: String,
    pub franchise_id: u64,
    pub id: u64,
}

/// POST /api/order response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order: Order,
    pub jwt: String,
}

/// Entry in GET /api/order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryEntry {
    pub id: u64,
    pub items: Vec<OrderItem>,
    pub store_id: String,
    pub franchise_id: u64,
    pub date: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}
