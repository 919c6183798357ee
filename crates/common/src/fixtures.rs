//! Literal payloads served by the mock backend

use crate::types::*;

pub const DINER_EMAIL: &str = "d@jwt.com";
pub const DINER_PASSWORD: &str = "a";
pub const DINER_TOKEN: &str = "abcdef";

pub const ADMIN_EMAIL: &str = "a@jwt.com";
pub const ADMIN_PASSWORD: &str = "admin";
pub const ADMIN_TOKEN: &str = "ghijkl";

pub const REGISTERED_USER_ID: u64 = 5;
pub const REGISTERED_TOKEN: &str = "newusertoken";

pub const ORDER_ID: u64 = 23;
pub const ORDER_JWT: &str = "eyJpYXQ";
pub const ORDER_STORE_ID: &str = "4";
pub const ORDER_FRANCHISE_ID: u64 = 2;

pub fn menu() -> Vec<MenuItem> {
    vec![
        MenuItem {
            id: 1,
            title: "Veggie".to_string(),
            image: "pizza1.png".to_string(),
            price: 0.0038,
            description: "A garden of delight".to_string(),
        },
        MenuItem {
            id: 2,
            title: "Pepperoni".to_string(),
            image: "pizza2.png".to_string(),
            price: 0.0042,
            description: "Spicy treat".to_string(),
        },
    ]
}

fn admin(id: u64, name: &str) -> FranchiseAdmin {
    FranchiseAdmin { id, name: name.to_string() }
}

fn store(id: u64, name: &str, total_revenue: f64) -> Store {
    Store { id, name: name.to_string(), total_revenue }
}

/// Three franchises; the last has neither admins nor stores.
pub fn franchises() -> Vec<Franchise> {
    vec![
        Franchise {
            id: 2,
            name: "LotaPizza".to_string(),
            admins: vec![admin(10, "Alice Johnson"), admin(11, "Bob Smith")],
            stores: vec![
                store(4, "Lehi", 0.005),
                store(5, "Springville", 0.007),
                store(6, "American Fork", 0.004),
            ],
        },
        Franchise {
            id: 3,
            name: "PizzaCorp".to_string(),
            admins: vec![admin(12, "Carol Williams")],
            stores: vec![store(7, "Spanish Fork", 0.006)],
        },
        Franchise {
            id: 4,
            name: "TopSpot".to_string(),
            admins: vec![],
            stores: vec![],
        },
    ]
}

fn user(id: u64, name: &str, email: &str, role: Role) -> User {
    User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        roles: vec![RoleAssignment { role }],
    }
}

pub fn diner_login() -> AuthResponse {
    AuthResponse {
        user: user(3, "Kai Chen", DINER_EMAIL, Role::Diner),
        token: DINER_TOKEN.to_string(),
    }
}

pub fn admin_login() -> AuthResponse {
    AuthResponse {
        user: user(1, "Admin User", ADMIN_EMAIL, Role::Admin),
        token: ADMIN_TOKEN.to_string(),
    }
}

/// Look up the canned login for a credential pair.
pub fn login_for(email: &str, password: &str) -> Option<AuthResponse> {
    match (email, password) {
        (DINER_EMAIL, DINER_PASSWORD) => Some(diner_login()),
        (ADMIN_EMAIL, ADMIN_PASSWORD) => Some(admin_login()),
        _ => None,
    }
}

/// New accounts always get the same id and the diner role.
pub fn registered_user(name: &str, email: &str) -> AuthResponse {
    AuthResponse {
        user: user(REGISTERED_USER_ID, name, email, Role::Diner),
        token: REGISTERED_TOKEN.to_string(),
    }
}

pub fn unauthorized() -> ErrorBody {
    ErrorBody { error: "Unauthorized".to_string() }
}

pub fn logged_out() -> MessageBody {
    MessageBody { message: "Logged out successfully".to_string() }
}

/// Order line items for one Veggie and one Pepperoni.
pub fn order_items() -> Vec<OrderItem> {
    menu()
        .into_iter()
        .map(|item| OrderItem {
            menu_id: item.id,
            description: item.title,
            price: item.price,
        })
        .collect()
}

/// Shape the frontend must post when the scenario checks out.
pub fn expected_order_request() -> OrderRequest {
    OrderRequest {
        items: order_items(),
        store_id: ORDER_STORE_ID.to_string(),
        franchise_id: ORDER_FRANCHISE_ID,
    }
}

pub fn order_placed() -> OrderPlaced {
    OrderPlaced {
        order: Order {
            items: order_items(),
            store_id: ORDER_STORE_ID.to_string(),
            franchise_id: ORDER_FRANCHISE_ID,
            id: ORDER_ID,
        },
        jwt: ORDER_JWT.to_string(),
    }
}

pub fn order_history() -> Vec<OrderHistoryEntry> {
    vec![OrderHistoryEntry {
        id: ORDER_ID,
        items: order_items(),
        store_id: ORDER_STORE_ID.to_string(),
        franchise_id: ORDER_FRANCHISE_ID,
        date: "2023-10-15T12:34:56Z".to_string(),
        status: "Completed".to_string(),
    }]
}
