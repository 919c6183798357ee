//! The "purchase with login" scenario
//!
//! One linear walk through the frontend: order two pizzas, log in as the
//! diner, pay, browse, switch to the admin account, try to add a
//! franchise, visit the docs, register a new account and finally hit an
//! unknown route.

use pizza_common::currency::{format_amount, format_btc, order_total};
use pizza_common::{fixtures, MockResult, MockRouter};

use crate::locator::Locator;
use crate::spec::{TestSpec, TestStep};

pub const PURCHASE_WITH_LOGIN: &str = "purchase with login";

/// Heading of the frontend's not-found view
pub const NOT_FOUND_TEXT: &str = "Oops";

/// Mock routes the scenario runs against
pub fn pizza_routes() -> MockResult<MockRouter> {
    MockRouter::pizza()
}

fn navigate(url: &str) -> TestStep {
    TestStep::Navigate { url: url.to_string() }
}

fn click(locator: Locator) -> TestStep {
    TestStep::Click { locator }
}

fn fill(locator: Locator, value: &str) -> TestStep {
    TestStep::Fill {
        locator,
        value: value.to_string(),
    }
}

fn press(locator: Locator, key: &str) -> TestStep {
    TestStep::Press {
        locator,
        key: key.to_string(),
    }
}

fn expect_text(locator: Locator, text: &str) -> TestStep {
    TestStep::ExpectText {
        locator,
        text: text.to_string(),
    }
}

fn button(name: &str) -> Locator {
    Locator::role("button").name(name)
}

fn link(name: &str) -> Locator {
    Locator::role("link").name(name)
}

fn main_region() -> Locator {
    Locator::role("main")
}

/// Fill the login form and submit it.
fn login(spec: TestSpec, email: &str, password: &str) -> TestSpec {
    spec.step(fill(Locator::placeholder("Email address"), email))
        .step(press(Locator::placeholder("Email address"), "Tab"))
        .step(fill(Locator::placeholder("Password"), password))
        .step(click(button("Login")))
}

pub fn purchase_with_login() -> TestSpec {
    let total = order_total(&fixtures::order_items());
    let pizzas = fixtures::order_items().len();

    let spec = TestSpec::new(PURCHASE_WITH_LOGIN)
        .description("Order, pay, browse, administer, register and hit a missing page")
        .tag("smoke")
        .tag("purchase")
        .step(navigate("/"))
        // Go to order page
        .step(click(button("Order now")))
        // Create order
        .step(expect_text(Locator::css("h2"), "Awesome is a click away"))
        .step(TestStep::Select {
            locator: Locator::role("combobox"),
            value: fixtures::ORDER_STORE_ID.to_string(),
        })
        .step(click(link("Image Description Veggie A")))
        .step(click(link("Image Description Pepperoni")))
        .step(expect_text(Locator::css("form"), &format!("Selected pizzas: {}", pizzas)))
        .step(click(button("Checkout")))
        // Login
        .step(click(Locator::placeholder("Email address")));
    let spec = login(spec, fixtures::DINER_EMAIL, fixtures::DINER_PASSWORD);

    let spec = spec
        // Pay
        .step(expect_text(main_region(), &format!("Send me those {} pizzas right now!", pizzas)))
        .step(expect_text(Locator::css("tbody"), "Veggie"))
        .step(expect_text(Locator::css("tbody"), "Pepperoni"))
        .step(expect_text(Locator::css("tfoot"), &format_btc(total)))
        .step(click(button("Pay now")))
        // Check balance
        .step(TestStep::ExpectVisible {
            locator: Locator::text(format_amount(total)),
        })
        .step(click(button("Verify")))
        // Browse
        .step(click(link("Franchise").within(Locator::label("Global"))))
        .step(click(link("About")))
        .step(click(link("History")))
        // Diner dashboard, via the user's initials
        .step(click(link("KC")))
        // Back in as admin
        .step(click(link("Logout")))
        .step(click(link("Login")))
        .step(click(Locator::text("Register").within(main_region())))
        .step(click(Locator::text("Login").within(main_region())));
    let spec = login(spec, fixtures::ADMIN_EMAIL, fixtures::ADMIN_PASSWORD);

    let spec = spec.step(click(link("Admin")));
    // Every franchise is listed, including one with no admins or stores
    let spec = fixtures::franchises()
        .iter()
        .fold(spec, |spec, franchise| spec.step(expect_text(main_region(), &franchise.name)));

    spec.step(click(button("Add Franchise")))
        .step(click(Locator::placeholder("franchise name")))
        .step(fill(Locator::placeholder("franchise name"), "franchise name test"))
        .step(press(Locator::placeholder("franchise name"), "Tab"))
        .step(fill(Locator::placeholder("franchisee admin email"), "franchse admin"))
        .step(click(button("Create")))
        // Docs
        .step(navigate("/docs"))
        // Register
        .step(click(link("Logout")))
        .step(click(link("Register")))
        .step(fill(Locator::placeholder("Full name"), "full name"))
        .step(press(Locator::placeholder("Full name"), "Tab"))
        .step(fill(Locator::placeholder("Email address"), "fullemail@test.com"))
        .step(press(Locator::placeholder("Email address"), "Tab"))
        .step(fill(Locator::placeholder("Password"), "b"))
        .step(click(button("Register")))
        // Unknown route
        .step(navigate("/no-exist"))
        .step(expect_text(main_region(), NOT_FOUND_TEXT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spec: &TestSpec) -> Vec<String> {
        spec.steps
            .iter()
            .filter_map(|s| match s {
                TestStep::ExpectText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_expected_totals_follow_menu_fixture() {
        let spec = purchase_with_login();
        let texts = texts(&spec);
        assert!(texts.contains(&"Selected pizzas: 2".to_string()));
        assert!(texts.contains(&"Send me those 2 pizzas right now!".to_string()));
        assert!(texts.contains(&"0.008 ₿".to_string()));
        assert!(spec.steps.contains(&TestStep::ExpectVisible {
            locator: Locator::text("0.008")
        }));
    }

    #[test]
    fn test_admin_sees_every_franchise() {
        let texts = texts(&purchase_with_login());
        for name in ["LotaPizza", "PizzaCorp", "TopSpot"] {
            assert!(texts.contains(&name.to_string()), "{}", name);
        }
    }

    #[test]
    fn test_unknown_route_ends_on_not_found() {
        let spec = purchase_with_login();
        let tail = &spec.steps[spec.steps.len() - 2..];
        assert_eq!(tail[0], TestStep::Navigate { url: "/no-exist".to_string() });
        assert_eq!(
            tail[1],
            TestStep::ExpectText {
                locator: Locator::role("main"),
                text: NOT_FOUND_TEXT.to_string()
            }
        );
    }

    #[test]
    fn test_navigations_in_order() {
        let urls: Vec<String> = purchase_with_login()
            .steps
            .iter()
            .filter_map(|s| match s {
                TestStep::Navigate { url } => Some(url.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(urls, vec!["/", "/docs", "/no-exist"]);
    }

    #[test]
    fn test_logs_in_as_diner_then_admin() {
        let fills: Vec<String> = purchase_with_login()
            .steps
            .iter()
            .filter_map(|s| match s {
                TestStep::Fill { locator, value } if *locator == Locator::placeholder("Email address") => {
                    Some(value.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec!["d@jwt.com", "a@jwt.com", "fullemail@test.com"]);
    }

    #[test]
    fn test_scenario_roundtrips_through_yaml() {
        let spec = purchase_with_login();
        let parsed = TestSpec::from_yaml(&spec.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed.name, PURCHASE_WITH_LOGIN);
        assert_eq!(parsed.steps, spec.steps);
    }

    #[test]
    fn test_routes_cover_all_endpoints() {
        let routes = pizza_routes().unwrap();
        assert_eq!(
            routes.patterns(),
            vec!["*/**/api/order/menu", "*/**/api/franchise", "*/**/api/auth", "*/**/api/order"]
        );
    }
}
