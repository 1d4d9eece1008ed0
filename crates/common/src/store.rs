//! SQLite-backed result store
//!
//! Owns the schema and every read/write for test outcomes, orders,
//! subscriptions, users and books. Write paths follow a strict
//! priority: the outcome row is committed first and unconditionally;
//! domain fan-out happens afterwards and is never allowed to raise into
//! the test runner. Swallowed failures are surfaced as values
//! ([`WriteOutcome::Swallowed`]) so callers and tests can assert on
//! them instead of scraping logs.

use crate::config::ConnectionProfile;
use crate::error::{Error, Result};
use crate::rules::{classify, FanoutRule};
use crate::scrub;
use crate::types::{
    Book, Order, OrderStatus, OrderType, OutcomeRecord, PaymentStatus, Subscription,
    SubscriptionStatus, SubscriptionType, TestOutcome, TestStatus, User, UserType,
    DEFAULT_PAYMENT_METHOD,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Historical fallback row id used when a singleton get-or-create
/// fails. Kept for compatibility with existing data; every use is
/// logged through [`Error::DegradedFallback`] first.
pub const FALLBACK_ROW_ID: i64 = 1;

/// Well-known key of the reusable singleton test user
pub const SINGLETON_USERNAME: &str = "shelfcheck_default";

/// Well-known key of the reusable singleton catalog book
pub const SINGLETON_BOOK_TITLE: &str = "Shelfcheck Sample Textbook";

/// Placeholder price of the singleton catalog book
pub const DEFAULT_BOOK_PRICE: f64 = 24.99;

/// Result of one never-raise write boundary call
#[derive(Debug)]
pub enum WriteOutcome {
    /// The write committed
    Committed,
    /// The write failed; the error was logged and absorbed
    Swallowed(Error),
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }

    pub fn swallowed(&self) -> Option<&Error> {
        match self {
            WriteOutcome::Committed => None,
            WriteOutcome::Swallowed(e) => Some(e),
        }
    }
}

/// What `record_and_categorize` did: the base outcome write, the rule
/// that matched, and the fan-out write for that rule.
#[derive(Debug)]
pub struct CategorizeReport {
    pub base: WriteOutcome,
    pub rule: FanoutRule,
    pub fanout: WriteOutcome,
}

/// Aggregate outcome counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStatistics {
    pub total: i64,
    pub passed: i64,
    pub failed: i64,
    pub skipped: i64,
    pub error: i64,
}

/// Result store over a single database connection.
///
/// One instance per test process; the inner connection is serialized
/// behind a mutex and every logical write auto-commits.
#[derive(Clone)]
pub struct ResultStore {
    conn: Arc<Mutex<Connection>>,
}

impl ResultStore {
    /// Open or create the results database for a resolved profile
    pub fn open(profile: &ConnectionProfile) -> Result<Self> {
        Self::open_path(profile.db_path())
    }

    /// Open or create a results database at an explicit path
    pub fn open_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;

        info!("Opened result store at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Idempotently create the outcome and domain tables
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Test outcomes, one row per executed test
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_case_name TEXT NOT NULL,
                module_name TEXT NOT NULL,
                test_status TEXT NOT NULL
                    CHECK (test_status IN ('PASSED', 'FAILED', 'SKIPPED', 'ERROR')),
                test_datetime TEXT NOT NULL,
                error_message TEXT,
                error_summary TEXT,
                total_time_duration REAL
                    CHECK (total_time_duration IS NULL OR total_time_duration >= 0),
                device_name TEXT,
                screen_resolution TEXT,
                error_link TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_test_results_status ON test_results(test_status);
            CREATE INDEX IF NOT EXISTS idx_test_results_module ON test_results(module_name);

            -- Synthetic storefront identities
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                affiliation TEXT NOT NULL DEFAULT '',
                user_type TEXT NOT NULL DEFAULT 'student',
                active INTEGER NOT NULL DEFAULT 1
            );

            -- Catalog items referenced by purchase orders
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                isbn TEXT NOT NULL UNIQUE,
                publisher TEXT NOT NULL DEFAULT '',
                year INTEGER,
                price REAL NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                available INTEGER NOT NULL DEFAULT 1
            );

            -- Monetary transactions created by categorized tests
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_number TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                book_id INTEGER REFERENCES books(id) ON DELETE SET NULL,
                order_type TEXT NOT NULL,
                amount REAL NOT NULL,
                payment_method TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                order_status TEXT NOT NULL,
                order_date TEXT NOT NULL,
                completed_date TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);

            -- Recurring-plan enrollments, always paired with an order
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                subscription_type TEXT NOT NULL,
                status TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                amount REAL NOT NULL,
                auto_renew INTEGER NOT NULL DEFAULT 1,
                payment_method TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
            "#,
        )?;

        debug!("Result store schema ensured");
        Ok(())
    }

    // ========================================================================
    // Outcome writes
    // ========================================================================

    /// Record one test outcome. Never raises: a database failure is
    /// logged and reported as [`WriteOutcome::Swallowed`]. Callers must
    /// not gate suite exit codes on this.
    pub fn record_outcome(&self, record: &OutcomeRecord) -> WriteOutcome {
        match self.insert_outcome(record) {
            Ok(id) => {
                debug!("Recorded outcome #{} for {}", id, record.name);
                WriteOutcome::Committed
            }
            Err(e) => {
                warn!("Swallowed outcome write for {}: {}", record.name, e);
                WriteOutcome::Swallowed(e)
            }
        }
    }

    fn insert_outcome(&self, record: &OutcomeRecord) -> Result<i64> {
        let module = scrub::normalize_module(&record.module);
        let summary = record.error_detail.as_deref().map(scrub::error_summary);
        let duration = record.duration_secs.map(|d| d.max(0.0));
        // Artifact links are only meaningful for non-passing outcomes
        let link = if record.status.is_passing() {
            None
        } else {
            record.artifact_link.as_deref()
        };
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO test_results (test_case_name, module_name, test_status, test_datetime,
                 error_message, error_summary, total_time_duration, device_name,
                 screen_resolution, error_link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.name,
                module,
                record.status.as_str(),
                now,
                record.error_detail,
                summary,
                duration,
                record.device,
                record.resolution,
                link,
                now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Record one test outcome, then fan out into the domain tables
    /// according to the categorization rules.
    ///
    /// The outcome write always happens first and its result is
    /// reported independently; a fan-out failure never rolls it back
    /// and never propagates to the caller.
    pub fn record_and_categorize(&self, record: &OutcomeRecord) -> CategorizeReport {
        let base = self.record_outcome(record);

        let rule = classify(&record.name, &record.module);
        let fanout = match self.apply_fanout(rule, record.status) {
            Ok(()) => WriteOutcome::Committed,
            Err(e) => {
                warn!(
                    "Swallowed {} fan-out for {}: {}",
                    rule.label(),
                    record.name,
                    e
                );
                WriteOutcome::Swallowed(e)
            }
        };

        CategorizeReport { base, rule, fanout }
    }

    fn apply_fanout(&self, rule: FanoutRule, status: TestStatus) -> Result<()> {
        match rule {
            FanoutRule::BookPurchase | FanoutRule::GeneralOrder => self.write_book_order(status),
            FanoutRule::Subscription(plan) => self.write_subscription(plan, status),
            FanoutRule::OnetimeOrder => self.write_plan_order(SubscriptionType::Onetime, status),
            FanoutRule::FreshUser => self.insert_fresh_user().map(|_| ()),
        }
    }

    // ========================================================================
    // Fan-out writers
    // ========================================================================

    fn write_book_order(&self, status: TestStatus) -> Result<()> {
        let user_id = self.user_id_or_fallback();
        let book_id = self.book_id_or_fallback();
        let amount = if status.is_passing() {
            DEFAULT_BOOK_PRICE
        } else {
            0.0
        };

        let conn = self.conn.lock();
        let id = insert_order_row(
            &conn,
            user_id,
            Some(book_id),
            OrderType::BookPurchase,
            amount,
            status,
        )?;
        debug!("Created book order #{}", id);
        Ok(())
    }

    fn write_plan_order(&self, plan: SubscriptionType, status: TestStatus) -> Result<()> {
        let user_id = self.user_id_or_fallback();
        let amount = if status.is_passing() { plan.price() } else { 0.0 };

        let conn = self.conn.lock();
        let id = insert_order_row(&conn, user_id, None, plan.order_type(), amount, status)?;
        debug!("Created {} order #{}", plan, id);
        Ok(())
    }

    fn write_subscription(&self, plan: SubscriptionType, status: TestStatus) -> Result<()> {
        let user_id = self.user_id_or_fallback();
        let start = Utc::now();
        let end = plan.end_date(start).unwrap_or(start);
        let sub_status = if status.is_passing() {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Cancelled
        };

        // The enrollment and its billing record must never be split
        // across inconsistent states.
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO subscriptions (user_id, subscription_type, status, start_date,
                 end_date, amount, auto_renew, payment_method)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                plan.as_str(),
                sub_status.as_str(),
                start.to_rfc3339(),
                end.to_rfc3339(),
                plan.price(),
                true,
                DEFAULT_PAYMENT_METHOD,
            ],
        )?;
        // Plan amounts stay at the fixed price regardless of outcome;
        // only the status flags reflect the failure.
        insert_order_row(&tx, user_id, None, plan.order_type(), plan.price(), status)?;
        tx.commit()?;

        debug!("Created {} subscription with paired order", plan);
        Ok(())
    }

    // ========================================================================
    // Singleton domain rows
    // ========================================================================

    /// Id of the reusable singleton test user, created on first use
    pub fn get_or_create_user(&self) -> Result<i64> {
        let conn = self.conn.lock();
        if let Some(id) = lookup_user(&conn, SINGLETON_USERNAME)? {
            return Ok(id);
        }

        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash, first_name, last_name,
                 affiliation, user_type, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
            params![
                SINGLETON_USERNAME,
                "qa@shelfcheck.test",
                "disabled",
                "Shelf",
                "Check",
                "QA",
                UserType::Student.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(conn.last_insert_rowid()),
            // A sibling worker process may have won the insert race
            Err(e) => lookup_user(&conn, SINGLETON_USERNAME)?.ok_or_else(|| e.into()),
        }
    }

    /// Id of the reusable singleton catalog book, created on first use
    pub fn get_or_create_book(&self) -> Result<i64> {
        let conn = self.conn.lock();
        if let Some(id) = lookup_book(&conn, SINGLETON_BOOK_TITLE)? {
            return Ok(id);
        }

        let inserted = conn.execute(
            "INSERT INTO books (title, author, isbn, publisher, year, price,
                 description, category, available)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
            params![
                SINGLETON_BOOK_TITLE,
                "QA Author",
                "9780000000000",
                "Shelfcheck Press",
                2024,
                DEFAULT_BOOK_PRICE,
                "Seeded catalog row for checkout tests",
                "textbook",
            ],
        );

        match inserted {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) => lookup_book(&conn, SINGLETON_BOOK_TITLE)?.ok_or_else(|| e.into()),
        }
    }

    /// Insert a distinct, non-singleton storefront user
    pub fn insert_fresh_user(&self) -> Result<i64> {
        let token = random_token(8);
        let username = format!("qa_user_{}", token);
        let email = format!("{}@shelfcheck.test", username);

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, first_name, last_name,
                 affiliation, user_type, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
            params![
                username,
                email,
                "disabled",
                "Fresh",
                "User",
                "QA",
                UserType::Student.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn user_id_or_fallback(&self) -> i64 {
        match self.get_or_create_user() {
            Ok(id) => id,
            Err(e) => {
                let degraded = Error::DegradedFallback {
                    kind: "user".to_string(),
                    source_msg: e.to_string(),
                    fallback_id: FALLBACK_ROW_ID,
                };
                warn!("{}", degraded);
                FALLBACK_ROW_ID
            }
        }
    }

    fn book_id_or_fallback(&self) -> i64 {
        match self.get_or_create_book() {
            Ok(id) => id,
            Err(e) => {
                let degraded = Error::DegradedFallback {
                    kind: "book".to_string(),
                    source_msg: e.to_string(),
                    fallback_id: FALLBACK_ROW_ID,
                };
                warn!("{}", degraded);
                FALLBACK_ROW_ID
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Most recent outcomes, newest first
    pub fn query_recent(&self, limit: usize) -> Result<Vec<TestOutcome>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, test_case_name, module_name, test_status, test_datetime,
                 error_message, error_summary, total_time_duration, device_name,
                 screen_resolution, error_link, created_at
             FROM test_results ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RawOutcomeRow {
                id: row.get(0)?,
                test_case_name: row.get(1)?,
                module_name: row.get(2)?,
                test_status: row.get(3)?,
                test_datetime: row.get(4)?,
                error_message: row.get(5)?,
                error_summary: row.get(6)?,
                total_time_duration: row.get(7)?,
                device_name: row.get(8)?,
                screen_resolution: row.get(9)?,
                error_link: row.get(10)?,
                created_at: row.get(11)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.parse()?);
        }
        Ok(results)
    }

    /// Aggregate outcome counts across the whole table
    pub fn query_statistics(&self) -> Result<StoreStatistics> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT COUNT(*),
                 COALESCE(SUM(test_status = 'PASSED'), 0),
                 COALESCE(SUM(test_status = 'FAILED'), 0),
                 COALESCE(SUM(test_status = 'SKIPPED'), 0),
                 COALESCE(SUM(test_status = 'ERROR'), 0)
             FROM test_results",
            [],
            |row| {
                Ok(StoreStatistics {
                    total: row.get(0)?,
                    passed: row.get(1)?,
                    failed: row.get(2)?,
                    skipped: row.get(3)?,
                    error: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// All orders, newest first
    pub fn query_orders(&self) -> Result<Vec<Order>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, order_number, user_id, book_id, order_type, amount, payment_method,
                 payment_status, order_status, order_date, completed_date
             FROM orders ORDER BY id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RawOrderRow {
                id: row.get(0)?,
                order_number: row.get(1)?,
                user_id: row.get(2)?,
                book_id: row.get(3)?,
                order_type: row.get(4)?,
                amount: row.get(5)?,
                payment_method: row.get(6)?,
                payment_status: row.get(7)?,
                order_status: row.get(8)?,
                order_date: row.get(9)?,
                completed_date: row.get(10)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.parse()?);
        }
        Ok(results)
    }

    /// All subscriptions, newest first
    pub fn query_subscriptions(&self) -> Result<Vec<Subscription>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, subscription_type, status, start_date, end_date, amount,
                 auto_renew, payment_method
             FROM subscriptions ORDER BY id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RawSubscriptionRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                subscription_type: row.get(2)?,
                status: row.get(3)?,
                start_date: row.get(4)?,
                end_date: row.get(5)?,
                amount: row.get(6)?,
                auto_renew: row.get(7)?,
                payment_method: row.get(8)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.parse()?);
        }
        Ok(results)
    }

    /// Fetch one user by id
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, username, email, password_hash, first_name, last_name,
                     affiliation, user_type, active
                 FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, bool>(8)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, username, email, password_hash, first_name, last_name, affiliation, user_type, active)) => {
                let user_type = match user_type.as_str() {
                    "instructor" => UserType::Instructor,
                    "admin" => UserType::Admin,
                    _ => UserType::Student,
                };
                Ok(Some(User {
                    id,
                    username,
                    email,
                    password_hash,
                    first_name,
                    last_name,
                    affiliation,
                    user_type,
                    active,
                }))
            }
            None => Ok(None),
        }
    }

    /// Fetch one book by id
    pub fn get_book(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, title, author, isbn, publisher, year, price, description,
                     category, available
                 FROM books WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Book {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        isbn: row.get(3)?,
                        publisher: row.get(4)?,
                        year: row.get(5)?,
                        price: row.get(6)?,
                        description: row.get(7)?,
                        category: row.get(8)?,
                        available: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

fn lookup_user(conn: &Connection, username: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?)
}

fn lookup_book(conn: &Connection, title: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM books WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )
        .optional()?)
}

fn insert_order_row(
    conn: &Connection,
    user_id: i64,
    book_id: Option<i64>,
    order_type: OrderType,
    amount: f64,
    status: TestStatus,
) -> Result<i64> {
    let (payment_status, order_status, completed) = billing_flags(status);
    conn.execute(
        "INSERT INTO orders (order_number, user_id, book_id, order_type, amount,
             payment_method, payment_status, order_status, order_date, completed_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            order_number(),
            user_id,
            book_id,
            order_type.as_str(),
            amount,
            DEFAULT_PAYMENT_METHOD,
            payment_status.as_str(),
            order_status.as_str(),
            Utc::now().to_rfc3339(),
            completed.map(|d| d.to_rfc3339()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn billing_flags(status: TestStatus) -> (PaymentStatus, OrderStatus, Option<DateTime<Utc>>) {
    if status.is_passing() {
        (PaymentStatus::Completed, OrderStatus::Completed, Some(Utc::now()))
    } else {
        (PaymentStatus::Failed, OrderStatus::Cancelled, None)
    }
}

/// Short random token; order numbers get a `QA-` prefix so synthetic
/// transactions are traceable in shared databases.
fn order_number() -> String {
    format!("QA-{}", random_token(10))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Raw outcome row before text fields are parsed
struct RawOutcomeRow {
    id: i64,
    test_case_name: String,
    module_name: String,
    test_status: String,
    test_datetime: String,
    error_message: Option<String>,
    error_summary: Option<String>,
    total_time_duration: Option<f64>,
    device_name: Option<String>,
    screen_resolution: Option<String>,
    error_link: Option<String>,
    created_at: String,
}

impl RawOutcomeRow {
    fn parse(self) -> Result<TestOutcome> {
        Ok(TestOutcome {
            id: self.id,
            test_case_name: self.test_case_name,
            module_name: self.module_name,
            test_status: parse_status(&self.test_status)?,
            test_datetime: parse_datetime(&self.test_datetime)?,
            error_message: self.error_message,
            error_summary: self.error_summary,
            total_time_duration: self.total_time_duration,
            device_name: self.device_name,
            screen_resolution: self.screen_resolution,
            error_link: self.error_link,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct RawOrderRow {
    id: i64,
    order_number: String,
    user_id: i64,
    book_id: Option<i64>,
    order_type: String,
    amount: f64,
    payment_method: String,
    payment_status: String,
    order_status: String,
    order_date: String,
    completed_date: Option<String>,
}

impl RawOrderRow {
    fn parse(self) -> Result<Order> {
        let order_type = OrderType::parse(&self.order_type)
            .ok_or_else(|| Error::Internal(format!("unknown order type {}", self.order_type)))?;
        let payment_status = match self.payment_status.as_str() {
            "completed" => PaymentStatus::Completed,
            _ => PaymentStatus::Failed,
        };
        let order_status = match self.order_status.as_str() {
            "completed" => OrderStatus::Completed,
            _ => OrderStatus::Cancelled,
        };
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            book_id: self.book_id,
            order_type,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_status,
            order_status,
            order_date: parse_datetime(&self.order_date)?,
            completed_date: self
                .completed_date
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
        })
    }
}

struct RawSubscriptionRow {
    id: i64,
    user_id: i64,
    subscription_type: String,
    status: String,
    start_date: String,
    end_date: String,
    amount: f64,
    auto_renew: bool,
    payment_method: String,
}

impl RawSubscriptionRow {
    fn parse(self) -> Result<Subscription> {
        let subscription_type = SubscriptionType::parse(&self.subscription_type).ok_or_else(|| {
            Error::Internal(format!(
                "unknown subscription type {}",
                self.subscription_type
            ))
        })?;
        let status = match self.status.as_str() {
            "active" => SubscriptionStatus::Active,
            "cancelled" => SubscriptionStatus::Cancelled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Pending,
        };
        Ok(Subscription {
            id: self.id,
            user_id: self.user_id,
            subscription_type,
            status,
            start_date: parse_datetime(&self.start_date)?,
            end_date: parse_datetime(&self.end_date)?,
            amount: self.amount,
            auto_renew: self.auto_renew,
            payment_method: self.payment_method,
        })
    }
}

fn parse_status(s: &str) -> Result<TestStatus> {
    TestStatus::parse(s).ok_or_else(|| Error::Internal(format!("unknown test status {}", s)))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .map_err(|e| Error::Internal(format!("bad datetime {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestStatus;

    fn record(name: &str, module: &str, status: TestStatus) -> OutcomeRecord {
        OutcomeRecord::new(name, module, status)
    }

    #[test]
    fn test_ensure_schema_idempotent() {
        let store = ResultStore::open_memory().unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();

        let stats = store.query_statistics().unwrap();
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.db");

        {
            let store = ResultStore::open_path(&path).unwrap();
            store.record_outcome(&record("test_persisted", "m", TestStatus::Passed));
        }

        // Reopening runs ensure_schema again against existing tables
        let store = ResultStore::open_path(&path).unwrap();
        let rows = store.query_recent(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].test_case_name, "test_persisted");
    }

    #[test]
    fn test_outcome_round_trip() {
        let store = ResultStore::open_memory().unwrap();
        let outcome = store.record_outcome(
            &record("test_cart_total", "tests.test_cart", TestStatus::Passed)
                .with_duration(3.25)
                .with_device("iPhone X")
                .with_resolution("375x812"),
        );
        assert!(outcome.is_committed());

        let rows = store.query_recent(10).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.test_case_name, "test_cart_total");
        assert_eq!(row.module_name, "cart");
        assert_eq!(row.test_status, TestStatus::Passed);
        assert_eq!(row.total_time_duration, Some(3.25));
        assert_eq!(row.device_name.as_deref(), Some("iPhone X"));
        assert_eq!(row.screen_resolution.as_deref(), Some("375x812"));
        assert!(row.error_message.is_none());
        assert!(row.error_link.is_none());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = ResultStore::open_memory().unwrap();
        for name in ["test_first", "test_second", "test_third"] {
            store.record_outcome(&record(name, "m", TestStatus::Passed));
        }

        let rows = store.query_recent(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].test_case_name, "test_third");
        assert_eq!(rows[1].test_case_name, "test_second");
    }

    #[test]
    fn test_record_outcome_never_raises() {
        let store = ResultStore::open_memory().unwrap();
        store
            .conn
            .lock()
            .execute("DROP TABLE test_results", [])
            .unwrap();

        let outcome = store.record_outcome(&record("test_x", "m", TestStatus::Passed));
        assert!(outcome.swallowed().is_some());
    }

    #[test]
    fn test_artifact_link_cleared_for_passing_outcomes() {
        let store = ResultStore::open_memory().unwrap();
        store.record_outcome(
            &record("test_green", "m", TestStatus::Passed)
                .with_artifact_link("file:///tmp/shot.png"),
        );
        store.record_outcome(
            &record("test_red", "m", TestStatus::Failed)
                .with_artifact_link("file:///tmp/shot.png"),
        );

        let rows = store.query_recent(10).unwrap();
        assert!(rows[1].error_link.is_none());
        assert_eq!(rows[0].error_link.as_deref(), Some("file:///tmp/shot.png"));
    }

    #[test]
    fn test_monthly_plan_scenario() {
        let store = ResultStore::open_memory().unwrap();
        let report = store.record_and_categorize(&record(
            "test_monthly_plan_purchase",
            "tests.test_monthly",
            TestStatus::Passed,
        ));
        assert!(report.base.is_committed());
        assert!(report.fanout.is_committed());
        assert_eq!(
            report.rule,
            FanoutRule::Subscription(SubscriptionType::Monthly)
        );

        let rows = store.query_recent(1).unwrap();
        assert_eq!(rows[0].module_name, "monthly");
        assert_eq!(rows[0].test_status, TestStatus::Passed);

        let subs = store.query_subscriptions().unwrap();
        assert_eq!(subs.len(), 1);
        let sub = &subs[0];
        assert_eq!(sub.subscription_type, SubscriptionType::Monthly);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.amount, 29.99);
        assert_eq!(sub.end_date, sub.start_date + chrono::Months::new(1));

        let orders = store.query_orders().unwrap();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.order_type, OrderType::MonthlyPlan);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.amount, 29.99);
        assert!(order.completed_date.is_some());
        assert!(order.order_number.starts_with("QA-"));
    }

    #[test]
    fn test_failed_book_purchase_scenario() {
        let store = ResultStore::open_memory().unwrap();
        let report = store.record_and_categorize(
            &record("test_book_purchase", "tests.test_book", TestStatus::Failed)
                .with_error_detail("TimeoutException: button not clickable"),
        );
        assert!(report.base.is_committed());
        assert_eq!(report.rule, FanoutRule::BookPurchase);

        let rows = store.query_recent(1).unwrap();
        assert_eq!(rows[0].error_summary.as_deref(), Some("button not clickable"));

        let orders = store.query_orders().unwrap();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.order_type, OrderType::BookPurchase);
        assert_eq!(order.amount, 0.0);
        assert_eq!(order.payment_status, PaymentStatus::Failed);
        assert_eq!(order.order_status, OrderStatus::Cancelled);
        assert!(order.completed_date.is_none());
        assert!(order.book_id.is_some());

        assert!(store.query_subscriptions().unwrap().is_empty());
    }

    #[test]
    fn test_onetime_plan_is_billing_only() {
        let store = ResultStore::open_memory().unwrap();
        store.record_and_categorize(&record(
            "test_onetime_access",
            "tests.test_plans",
            TestStatus::Passed,
        ));

        let orders = store.query_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_type, OrderType::OnetimePlan);
        assert_eq!(orders[0].amount, 99.99);
        assert_eq!(orders[0].payment_status, PaymentStatus::Completed);
        assert!(orders[0].book_id.is_none());

        assert!(store.query_subscriptions().unwrap().is_empty());
    }

    #[test]
    fn test_six_month_plan_scenario() {
        let store = ResultStore::open_memory().unwrap();
        store.record_and_categorize(&record(
            "test_six_month_plan",
            "tests.test_plans",
            TestStatus::Failed,
        ));

        let subs = store.query_subscriptions().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].subscription_type, SubscriptionType::SixMonth);
        assert_eq!(subs[0].status, SubscriptionStatus::Cancelled);
        // Plan amounts keep the fixed price even on failure
        assert_eq!(subs[0].amount, 149.99);

        let orders = store.query_orders().unwrap();
        assert_eq!(orders[0].order_type, OrderType::SixMonthPlan);
        assert_eq!(orders[0].amount, 149.99);
        assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
    }

    #[test]
    fn test_fresh_user_fanout() {
        let store = ResultStore::open_memory().unwrap();
        store.record_and_categorize(&record(
            "test_user_signup",
            "tests.test_accounts",
            TestStatus::Passed,
        ));

        // A fresh user, not the singleton, and no billing rows
        assert!(store.query_orders().unwrap().is_empty());
        let fresh: i64 = store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fresh, 1);

        let singleton = store.get_or_create_user().unwrap();
        let fresh_id: i64 = store
            .conn
            .lock()
            .query_row(
                "SELECT id FROM users WHERE username LIKE 'qa_user_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_ne!(singleton, fresh_id);
    }

    #[test]
    fn test_uncategorized_test_gets_general_order() {
        let store = ResultStore::open_memory().unwrap();
        let report = store.record_and_categorize(&record(
            "test_three_month_plan",
            "tests.test_plans",
            TestStatus::Passed,
        ));
        assert_eq!(report.rule, FanoutRule::GeneralOrder);

        let orders = store.query_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_type, OrderType::BookPurchase);
        assert!(store.query_subscriptions().unwrap().is_empty());
    }

    #[test]
    fn test_singleton_user_and_book() {
        let store = ResultStore::open_memory().unwrap();
        let first = store.get_or_create_user().unwrap();
        let second = store.get_or_create_user().unwrap();
        assert_eq!(first, second);

        let book_first = store.get_or_create_book().unwrap();
        let book_second = store.get_or_create_book().unwrap();
        assert_eq!(book_first, book_second);

        let book = store.get_book(book_first).unwrap().unwrap();
        assert_eq!(book.title, SINGLETON_BOOK_TITLE);
        assert_eq!(book.price, DEFAULT_BOOK_PRICE);
    }

    #[test]
    fn test_fanout_failure_never_masks_base_write() {
        let store = ResultStore::open_memory().unwrap();
        store.conn.lock().execute("DROP TABLE orders", []).unwrap();

        let report = store.record_and_categorize(&record(
            "test_book_purchase",
            "tests.test_book",
            TestStatus::Passed,
        ));
        assert!(report.base.is_committed());
        assert!(report.fanout.swallowed().is_some());

        assert_eq!(store.query_recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_statistics() {
        let store = ResultStore::open_memory().unwrap();
        store.record_outcome(&record("a", "m", TestStatus::Passed));
        store.record_outcome(&record("b", "m", TestStatus::Passed));
        store.record_outcome(&record("c", "m", TestStatus::Failed));
        store.record_outcome(&record("d", "m", TestStatus::Skipped));
        store.record_outcome(&record("e", "m", TestStatus::Error));

        let stats = store.query_statistics().unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.error, 1);
    }
}
