//! Core types for shelfcheck

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single executed test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl TestStatus {
    /// Column text as persisted in `test_results.test_status`
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
            TestStatus::Error => "ERROR",
        }
    }

    /// Parse persisted column text back into a status
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PASSED" => Some(TestStatus::Passed),
            "FAILED" => Some(TestStatus::Failed),
            "SKIPPED" => Some(TestStatus::Skipped),
            "ERROR" => Some(TestStatus::Error),
            _ => None,
        }
    }

    pub fn is_passing(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    BookPurchase,
    MonthlyPlan,
    ThreeMonthPlan,
    SixMonthPlan,
    PopularPlan,
    OnetimePlan,
    AnnualPlan,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::BookPurchase => "book_purchase",
            OrderType::MonthlyPlan => "monthly_plan",
            OrderType::ThreeMonthPlan => "three_month_plan",
            OrderType::SixMonthPlan => "six_month_plan",
            OrderType::PopularPlan => "popular_plan",
            OrderType::OnetimePlan => "onetime_plan",
            OrderType::AnnualPlan => "annual_plan",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "book_purchase" => Some(OrderType::BookPurchase),
            "monthly_plan" => Some(OrderType::MonthlyPlan),
            "three_month_plan" => Some(OrderType::ThreeMonthPlan),
            "six_month_plan" => Some(OrderType::SixMonthPlan),
            "popular_plan" => Some(OrderType::PopularPlan),
            "onetime_plan" => Some(OrderType::OnetimePlan),
            "annual_plan" => Some(OrderType::AnnualPlan),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurring-plan kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Monthly,
    ThreeMonth,
    SixMonth,
    Popular,
    Onetime,
    Annual,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Monthly => "monthly",
            SubscriptionType::ThreeMonth => "three_month",
            SubscriptionType::SixMonth => "six_month",
            SubscriptionType::Popular => "popular",
            SubscriptionType::Onetime => "onetime",
            SubscriptionType::Annual => "annual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(SubscriptionType::Monthly),
            "three_month" => Some(SubscriptionType::ThreeMonth),
            "six_month" => Some(SubscriptionType::SixMonth),
            "popular" => Some(SubscriptionType::Popular),
            "onetime" => Some(SubscriptionType::Onetime),
            "annual" => Some(SubscriptionType::Annual),
            _ => None,
        }
    }

    /// Fixed plan price. These are business constants shared with the
    /// storefront under test and must not drift.
    pub fn price(&self) -> f64 {
        match self {
            SubscriptionType::Monthly => 29.99,
            SubscriptionType::ThreeMonth | SubscriptionType::Popular => 79.99,
            SubscriptionType::SixMonth => 149.99,
            SubscriptionType::Onetime => 99.99,
            SubscriptionType::Annual => 299.99,
        }
    }

    /// Plan term in calendar months. Onetime plans are billing-only and
    /// carry no term.
    pub fn term_months(&self) -> Option<u32> {
        match self {
            SubscriptionType::Monthly => Some(1),
            SubscriptionType::ThreeMonth | SubscriptionType::Popular => Some(3),
            SubscriptionType::SixMonth => Some(6),
            SubscriptionType::Annual => Some(12),
            SubscriptionType::Onetime => None,
        }
    }

    /// End date for an enrollment starting at `start`
    pub fn end_date(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.term_months()
            .map(|months| start + Months::new(months))
    }

    /// The billing-record kind paired with this plan
    pub fn order_type(&self) -> OrderType {
        match self {
            SubscriptionType::Monthly => OrderType::MonthlyPlan,
            SubscriptionType::ThreeMonth => OrderType::ThreeMonthPlan,
            SubscriptionType::SixMonth => OrderType::SixMonthPlan,
            SubscriptionType::Popular => OrderType::PopularPlan,
            SubscriptionType::Onetime => OrderType::OnetimePlan,
            SubscriptionType::Annual => OrderType::AnnualPlan,
        }
    }
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
    Pending,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    Instructor,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Instructor => "instructor",
            UserType::Admin => "admin",
        }
    }
}

/// Payment method recorded on orders and subscriptions created by the
/// fan-out writers. Synthetic purchases all bill the same way.
pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";

/// One persisted test outcome row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub id: i64,
    pub test_case_name: String,
    pub module_name: String,
    pub test_status: TestStatus,
    pub test_datetime: DateTime<Utc>,
    pub error_message: Option<String>,
    pub error_summary: Option<String>,
    pub total_time_duration: Option<f64>,
    pub device_name: Option<String>,
    pub screen_resolution: Option<String>,
    pub error_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Write-side input for one test outcome. The store derives the module
/// name, error summary and timestamps itself.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub name: String,
    pub module: String,
    pub status: TestStatus,
    pub error_detail: Option<String>,
    pub duration_secs: Option<f64>,
    pub device: Option<String>,
    pub resolution: Option<String>,
    pub artifact_link: Option<String>,
}

impl OutcomeRecord {
    pub fn new(name: impl Into<String>, module: impl Into<String>, status: TestStatus) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            status,
            error_detail: None,
            duration_secs: None,
            device: None,
            resolution: None,
            artifact_link: None,
        }
    }

    pub fn with_error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs.max(0.0));
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_artifact_link(mut self, link: impl Into<String>) -> Self {
        self.artifact_link = Some(link.into());
        self
    }
}

/// Synthetic storefront identity used to attribute orders and
/// subscriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub affiliation: String,
    pub user_type: UserType,
    pub active: bool,
}

/// Catalog item referenced by purchase orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: String,
    pub year: i32,
    pub price: f64,
    pub description: String,
    pub category: String,
    pub available: bool,
}

/// One monetary transaction produced by a categorized test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub book_id: Option<i64>,
    pub order_type: OrderType,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
}

/// One recurring-plan enrollment produced by a categorized test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub subscription_type: SubscriptionType,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub amount: f64,
    pub auto_renew: bool,
    pub payment_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TestStatus::Passed,
            TestStatus::Failed,
            TestStatus::Skipped,
            TestStatus::Error,
        ] {
            assert_eq!(TestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TestStatus::parse("passed"), Some(TestStatus::Passed));
        assert_eq!(TestStatus::parse("bogus"), None);
    }

    #[test]
    fn test_plan_pricing_table() {
        assert_eq!(SubscriptionType::Monthly.price(), 29.99);
        assert_eq!(SubscriptionType::ThreeMonth.price(), 79.99);
        assert_eq!(SubscriptionType::Popular.price(), 79.99);
        assert_eq!(SubscriptionType::SixMonth.price(), 149.99);
        assert_eq!(SubscriptionType::Onetime.price(), 99.99);
        assert_eq!(SubscriptionType::Annual.price(), 299.99);
    }

    #[test]
    fn test_plan_terms() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();

        let monthly = SubscriptionType::Monthly.end_date(start).unwrap();
        assert_eq!(monthly, Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap());

        let six = SubscriptionType::SixMonth.end_date(start).unwrap();
        assert_eq!(six, Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap());

        let annual = SubscriptionType::Annual.end_date(start).unwrap();
        assert_eq!(annual, Utc.with_ymd_and_hms(2027, 1, 15, 12, 0, 0).unwrap());

        // Billing-only plans have no enrollment term
        assert!(SubscriptionType::Onetime.end_date(start).is_none());
    }

    #[test]
    fn test_paired_order_types() {
        assert_eq!(
            SubscriptionType::Monthly.order_type(),
            OrderType::MonthlyPlan
        );
        assert_eq!(
            SubscriptionType::SixMonth.order_type(),
            OrderType::SixMonthPlan
        );
        assert_eq!(
            SubscriptionType::Popular.order_type(),
            OrderType::PopularPlan
        );
    }

    #[test]
    fn test_duration_clamped_non_negative() {
        let record = OutcomeRecord::new("t", "m", TestStatus::Passed).with_duration(-1.5);
        assert_eq!(record.duration_secs, Some(0.0));
    }
}
