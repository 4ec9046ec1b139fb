//! Request shape checking for JSON bodies and query strings.
//!
//! Every parser either returns a fully typed value or the complete list of
//! field errors, so handlers never act on a partially valid payload.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{AccountStatus, AuditLevel, Timeframe};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 50;
pub const DEFAULT_HISTORY_COUNT: u64 = 100;
pub const MAX_HISTORY_COUNT: u64 = 5000;
pub const MAX_MARGIN_LEVEL: f64 = 10_000.0;

const NAME_LEN: RangeInclusive<usize> = 1..=100;
const LOGIN_LEN: RangeInclusive<usize> = 1..=50;
const SYMBOL_LEN: RangeInclusive<usize> = 1..=20;
const SEARCH_LEN: RangeInclusive<usize> = 1..=100;

fn login_pattern() -> &'static Regex {
    static LOGIN: OnceLock<Regex> = OnceLock::new();
    LOGIN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("login pattern compiles"))
}

fn symbol_pattern() -> &'static Regex {
    static SYMBOL: OnceLock<Regex> = OnceLock::new();
    SYMBOL.get_or_init(|| Regex::new(r"^[A-Za-z0-9._]+$").expect("symbol pattern compiles"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip)]
    pub missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("validation failed: {}", summarize(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        ValidationErrors(vec![FieldError {
            field: field.to_string(),
            message: message.into(),
            missing: false,
        }])
    }

    /// True when at least one required field was absent or blank.
    pub fn has_missing(&self) -> bool {
        self.0.iter().any(|e| e.missing)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }
}

/// Field-by-field reader over a JSON object that accumulates errors.
///
/// `null` is treated the same as an absent key.
pub struct Fields<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Result<Self, ValidationErrors> {
        match value.as_object() {
            Some(body) => Ok(Self { body, errors: Vec::new() }),
            None => Err(ValidationErrors::single("body", "Expected a JSON object")),
        }
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.body.get(field).filter(|v| !v.is_null())
    }

    fn missing(&mut self, field: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: "Required".to_string(),
            missing: true,
        });
    }

    fn invalid(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
            missing: false,
        });
    }

    pub fn required_str(&mut self, field: &str, len: RangeInclusive<usize>) -> Option<String> {
        match self.value(field) {
            None => {
                self.missing(field);
                None
            }
            Some(Value::String(text)) if text.trim().is_empty() => {
                self.missing(field);
                None
            }
            Some(_) => self.optional_str(field, len),
        }
    }

    pub fn optional_str(&mut self, field: &str, len: RangeInclusive<usize>) -> Option<String> {
        let value = self.value(field)?;
        let Some(text) = value.as_str() else {
            self.invalid(field, "Expected a string");
            return None;
        };
        let text = text.trim();
        if !len.contains(&text.chars().count()) {
            self.invalid(
                field,
                format!("Must be between {} and {} characters", len.start(), len.end()),
            );
            return None;
        }
        Some(text.to_string())
    }

    /// Checks an already-read string against `pattern`, dropping it on mismatch.
    pub fn matching(
        &mut self,
        field: &str,
        value: Option<String>,
        pattern: &Regex,
        message: &str,
    ) -> Option<String> {
        let value = value?;
        if pattern.is_match(&value) {
            Some(value)
        } else {
            self.invalid(field, message);
            None
        }
    }

    pub fn number(&mut self, field: &str, range: RangeInclusive<f64>) -> Option<f64> {
        let value = self.value(field)?;
        let Some(number) = value.as_f64().filter(|n| n.is_finite()) else {
            self.invalid(field, "Expected a number");
            return None;
        };
        if !range.contains(&number) {
            let message = if range.end().is_infinite() {
                format!("Must be at least {}", range.start())
            } else {
                format!("Must be between {} and {}", range.start(), range.end())
            };
            self.invalid(field, message);
            return None;
        }
        Some(number)
    }

    pub fn boolean(&mut self, field: &str) -> Option<bool> {
        let value = self.value(field)?;
        match value.as_bool() {
            Some(flag) => Some(flag),
            None => {
                self.invalid(field, "Expected a boolean");
                None
            }
        }
    }

    pub fn choice<T>(&mut self, field: &str) -> Option<T>
    where
        T: FromStr<Err = String>,
    {
        let value = self.value(field)?;
        let Some(text) = value.as_str() else {
            self.invalid(field, "Expected a string");
            return None;
        };
        match text.trim().parse::<T>() {
            Ok(choice) => Some(choice),
            Err(e) => {
                self.invalid(field, e);
                None
            }
        }
    }

    pub fn object(&mut self, field: &str) -> Option<&'a Map<String, Value>> {
        let value = self.value(field)?;
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.invalid(field, "Expected an object");
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Upsert payload. The identity is required; every other field is `Some` only when
/// the body carries it, so an update leaves absent fields untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInput {
    pub broker: String,
    pub server: String,
    pub login: String,
    pub alias: Option<String>,
    pub balance: Option<f64>,
    pub equity: Option<f64>,
    pub margin_level: Option<f64>,
    pub status: Option<AccountStatus>,
}

impl AccountInput {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut fields = Fields::new(value)?;

        let broker = fields.required_str("broker", NAME_LEN);
        let server = fields.required_str("server", NAME_LEN);
        let login = fields.required_str("login", LOGIN_LEN);
        let login = fields.matching("login", login, login_pattern(), "Login must be alphanumeric");
        let alias = fields.optional_str("alias", 0..=100).filter(|a| !a.is_empty());
        let balance = fields.number("balance", 0.0..=f64::INFINITY);
        let equity = fields.number("equity", 0.0..=f64::INFINITY);
        let margin_level = fields.number("marginLevel", 0.0..=MAX_MARGIN_LEVEL);
        let status = fields.choice::<AccountStatus>("status");

        fields.finish()?;

        match (broker, server, login) {
            (Some(broker), Some(server), Some(login)) => Ok(AccountInput {
                broker,
                server,
                login,
                alias,
                balance,
                equity,
                margin_level,
                status,
            }),
            // finish() already reported every missing field
            _ => Err(ValidationErrors::default()),
        }
    }
}

/// Partial account update: only the keys present in the body are `Some`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountPatch {
    pub broker: Option<String>,
    pub server: Option<String>,
    pub login: Option<String>,
    pub alias: Option<String>,
    pub balance: Option<f64>,
    pub equity: Option<f64>,
    pub margin_level: Option<f64>,
    pub status: Option<AccountStatus>,
}

impl AccountPatch {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut fields = Fields::new(value)?;

        let broker = fields.optional_str("broker", NAME_LEN);
        let server = fields.optional_str("server", NAME_LEN);
        let login = fields.optional_str("login", LOGIN_LEN);
        let login = fields.matching("login", login, login_pattern(), "Login must be alphanumeric");
        let patch = AccountPatch {
            broker,
            server,
            login,
            alias: fields.optional_str("alias", 0..=100),
            balance: fields.number("balance", 0.0..=f64::INFINITY),
            equity: fields.number("equity", 0.0..=f64::INFINITY),
            margin_level: fields.number("marginLevel", 0.0..=MAX_MARGIN_LEVEL),
            status: fields.choice::<AccountStatus>("status"),
        };

        fields.finish()?;
        Ok(patch)
    }

    pub fn touches_identity(&self) -> bool {
        self.broker.is_some() || self.server.is_some() || self.login.is_some()
    }
}

// ---------------------------------------------------------------------------
// System toggle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleInput {
    pub ai_active: Option<bool>,
    pub risk_monitor_active: Option<bool>,
}

impl ToggleInput {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut fields = Fields::new(value)?;
        let input = ToggleInput {
            ai_active: fields.boolean("aiActive"),
            risk_monitor_active: fields.boolean("riskMonitorActive"),
        };
        fields.finish()?;
        Ok(input)
    }

    pub fn is_empty(&self) -> bool {
        self.ai_active.is_none() && self.risk_monitor_active.is_none()
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub name: String,
    pub provider: String,
    pub version: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub hyperparameters: Option<Map<String, Value>>,
}

impl TrainRequest {
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut fields = Fields::new(value)?;

        let name = fields.required_str("name", NAME_LEN);
        let provider = fields.required_str("provider", 1..=50);
        let version = fields.required_str("version", 1..=50);
        let symbol = fields.required_str("symbol", SYMBOL_LEN);
        let symbol = fields.matching("symbol", symbol, symbol_pattern(), "Symbol must be alphanumeric");
        let timeframe = match fields.required_str("timeframe", 1..=10) {
            Some(raw) => match raw.parse::<Timeframe>() {
                Ok(timeframe) => Some(timeframe),
                Err(e) => {
                    fields.invalid("timeframe", e);
                    None
                }
            },
            None => None,
        };
        let hyperparameters = fields.object("hyperparameters").cloned();
        if let Some(overrides) = &hyperparameters {
            check_hyperparameters(&mut fields, overrides);
        }

        fields.finish()?;

        match (name, provider, version, symbol, timeframe) {
            (Some(name), Some(provider), Some(version), Some(symbol), Some(timeframe)) => Ok(TrainRequest {
                name,
                provider,
                version,
                symbol,
                timeframe,
                hyperparameters,
            }),
            _ => Err(ValidationErrors::default()),
        }
    }
}

/// Known hyperparameter keys must carry usable values; unknown keys pass through.
fn check_hyperparameters(fields: &mut Fields<'_>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        let problem = match key.as_str() {
            "epochs" | "batchSize" | "lookbackWindow" => {
                (value.as_u64().is_none()).then_some("Expected a non-negative integer")
            }
            "learningRate" => value
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .is_none()
                .then_some("Expected a non-negative number"),
            "validationSplit" => value
                .as_f64()
                .filter(|n| (0.0..=1.0).contains(n))
                .is_none()
                .then_some("Expected a number between 0 and 1"),
            _ => None,
        };
        if let Some(message) = problem {
            fields.invalid(&format!("hyperparameters.{}", key), message);
        }
    }
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

fn query_text<'q>(query: &'q HashMap<String, String>, key: &str) -> Option<&'q str> {
    query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Integer query value clamped to `range`. Digit strings too long for `i64` clamp to
/// the matching bound instead of being treated as garbage.
fn clamped_int(text: &str, range: RangeInclusive<i64>) -> Option<i64> {
    let parsed = match text.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            let (negative, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text.strip_prefix('+').unwrap_or(text)),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if negative {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    };
    Some(parsed.clamp(*range.start(), *range.end()))
}

/// Parses the `?id=` parameter. Only positive integers are ids.
pub fn parse_id(raw: Option<&String>) -> Option<i32> {
    raw?.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Page {
    fn default() -> Self {
        Page { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl Page {
    /// Lenient: bad values fall back to defaults instead of failing the request.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let limit = query_text(query, "limit")
            .and_then(|v| clamped_int(v, 1..=MAX_PAGE_LIMIT as i64))
            .map(|l| l as u64)
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = query_text(query, "offset")
            .and_then(|v| clamped_int(v, 0..=i64::MAX))
            .map(|o| o as u64)
            .unwrap_or(0);
        Page { limit, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountFilter {
    pub broker: Option<String>,
    pub status: Option<AccountStatus>,
    pub search: Option<String>,
    pub page: Page,
}

impl AccountFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let broker = bounded_query_text(query, "broker", NAME_LEN, &mut errors);
        let search = bounded_query_text(query, "search", SEARCH_LEN, &mut errors);
        let status = match query_text(query, "status").map(str::parse::<AccountStatus>) {
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                errors.push(query_error("status", e));
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }
        Ok(AccountFilter {
            broker,
            status,
            search,
            page: Page::from_query(query),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditFilter {
    pub category: Option<String>,
    pub level: Option<AuditLevel>,
    pub page: Page,
}

impl AuditFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let category = bounded_query_text(query, "category", 1..=50, &mut errors);
        let level = match query_text(query, "level").map(str::parse::<AuditLevel>) {
            Some(Ok(level)) => Some(level),
            Some(Err(e)) => {
                errors.push(query_error("level", e));
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }
        Ok(AuditFilter {
            category,
            level,
            page: Page::from_query(query),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: u64,
}

impl HistoryQuery {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();
        let symbol = bounded_query_text(query, "symbol", SYMBOL_LEN, &mut errors);

        let symbol = match symbol {
            Some(symbol) if symbol_pattern().is_match(&symbol) => symbol,
            Some(_) => return Err(ValidationErrors::single("symbol", "Symbol must be alphanumeric")),
            None if errors.is_empty() => {
                return Err(ValidationErrors(vec![FieldError {
                    field: "symbol".to_string(),
                    message: "Required".to_string(),
                    missing: true,
                }]))
            }
            None => return Err(ValidationErrors(errors)),
        };

        // Unknown timeframes fall back to the hourly chart
        let timeframe = query_text(query, "timeframe")
            .and_then(|v| v.parse::<Timeframe>().ok())
            .unwrap_or_default();
        let count = query_text(query, "count")
            .and_then(|v| clamped_int(v, 1..=MAX_HISTORY_COUNT as i64))
            .map(|c| c as u64)
            .unwrap_or(DEFAULT_HISTORY_COUNT);

        Ok(HistoryQuery { symbol, timeframe, count })
    }
}

fn bounded_query_text(
    query: &HashMap<String, String>,
    key: &str,
    len: RangeInclusive<usize>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let text = query_text(query, key)?;
    if len.contains(&text.chars().count()) {
        Some(text.to_string())
    } else {
        errors.push(query_error(
            key,
            format!("Must be between {} and {} characters", len.start(), len.end()),
        ));
        None
    }
}

fn query_error(field: &str, message: impl Into<String>) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.into(),
        missing: false,
    }
}
