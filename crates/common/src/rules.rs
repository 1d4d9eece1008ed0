//! Categorization rules
//!
//! A recorded outcome fans out into at most one group of domain rows.
//! Which group is decided here, by an ordered keyword table matched
//! case-insensitively against the test name and module. Precedence is
//! part of the contract: `"book"` is checked first, and the first
//! matching rule wins even when a name plausibly matches several
//! keywords (`"book_user_test"` is a book purchase).

use crate::types::SubscriptionType;

/// The fan-out group a test outcome maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutRule {
    /// Order referencing the singleton catalog book
    BookPurchase,
    /// Subscription enrollment plus its paired plan order
    Subscription(SubscriptionType),
    /// Billing-only plan: an order, never a subscription row
    OnetimeOrder,
    /// Insert a fresh, non-singleton storefront user
    FreshUser,
    /// Catch-all order so uncategorized tests still leave an auditable
    /// financial record
    GeneralOrder,
}

impl FanoutRule {
    pub fn label(&self) -> &'static str {
        match self {
            FanoutRule::BookPurchase => "book_purchase",
            FanoutRule::Subscription(SubscriptionType::Monthly) => "subscription_monthly",
            FanoutRule::Subscription(SubscriptionType::ThreeMonth) => "subscription_three_month",
            FanoutRule::Subscription(SubscriptionType::SixMonth) => "subscription_six_month",
            FanoutRule::Subscription(SubscriptionType::Popular) => "subscription_popular",
            FanoutRule::Subscription(SubscriptionType::Onetime) => "subscription_onetime",
            FanoutRule::Subscription(SubscriptionType::Annual) => "subscription_annual",
            FanoutRule::OnetimeOrder => "onetime_order",
            FanoutRule::FreshUser => "fresh_user",
            FanoutRule::GeneralOrder => "general_order",
        }
    }
}

/// Ordered keyword table. Entries are evaluated top to bottom; do not
/// reorder without revisiting every precedence test below.
const RULES: [(&str, FanoutRule); 5] = [
    ("book", FanoutRule::BookPurchase),
    ("monthly", FanoutRule::Subscription(SubscriptionType::Monthly)),
    ("six_month", FanoutRule::Subscription(SubscriptionType::SixMonth)),
    ("onetime", FanoutRule::OnetimeOrder),
    ("user", FanoutRule::FreshUser),
];

/// Classify a test by name and owning module
pub fn classify(name: &str, module: &str) -> FanoutRule {
    let haystack = format!("{} {}", name, module).to_lowercase();
    for (keyword, rule) in RULES {
        if haystack.contains(keyword) {
            return rule;
        }
    }
    FanoutRule::GeneralOrder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_dispatch() {
        assert_eq!(classify("test_book_purchase", "checkout"), FanoutRule::BookPurchase);
        assert_eq!(
            classify("test_monthly_plan_purchase", "plans"),
            FanoutRule::Subscription(SubscriptionType::Monthly)
        );
        assert_eq!(
            classify("test_six_month_plan", "plans"),
            FanoutRule::Subscription(SubscriptionType::SixMonth)
        );
        assert_eq!(classify("test_onetime_access", "plans"), FanoutRule::OnetimeOrder);
        assert_eq!(classify("test_user_signup", "accounts"), FanoutRule::FreshUser);
        assert_eq!(classify("test_cart_badge", "navigation"), FanoutRule::GeneralOrder);
    }

    #[test]
    fn test_first_match_wins() {
        // "book" precedes "user" even though both keywords appear
        assert_eq!(classify("book_user_test", "checkout"), FanoutRule::BookPurchase);
        // "monthly" precedes "user"
        assert_eq!(
            classify("test_user_monthly", "plans"),
            FanoutRule::Subscription(SubscriptionType::Monthly)
        );
    }

    #[test]
    fn test_module_participates_in_matching() {
        assert_eq!(classify("test_happy_path", "book_catalog"), FanoutRule::BookPurchase);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(classify("TEST_BOOK_PURCHASE", "Checkout"), FanoutRule::BookPurchase);
    }

    #[test]
    fn test_three_month_falls_through() {
        // No rule carries the "three_month" keyword; those tests land on
        // the catch-all order path.
        assert_eq!(classify("test_three_month_plan", "plans"), FanoutRule::GeneralOrder);
        assert_eq!(classify("test_popular_plan", "plans"), FanoutRule::GeneralOrder);
    }
}
