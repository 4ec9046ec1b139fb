use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Declares a string-backed status enum stored as plain text in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "Invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

text_enum!(
    /// Broker connection state of an MT5 account.
    AccountStatus {
        Connected => "connected",
        Disconnected => "disconnected",
    }
);

text_enum!(
    /// Lifecycle of an AI model row. `training` only ever moves to `trained` or `failed`.
    ModelStatus {
        Training => "training",
        Trained => "trained",
        Failed => "failed",
        Active => "active",
        Standby => "standby",
    }
);

text_enum!(
    AuditLevel {
        Info => "info",
        Error => "error",
    }
);

text_enum!(
    TrainingJobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
);

text_enum!(
    /// Chart timeframes understood by the MT5 history feed.
    Timeframe {
        M1 => "1m",
        M5 => "5m",
        M15 => "15m",
        M30 => "30m",
        H1 => "1h",
        H4 => "4h",
        D1 => "1d",
    }
);

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Disconnected
    }
}

impl TrainingJobStatus {
    /// Statuses a job can still be picked up (or cancelled) from.
    pub fn pending() -> [TrainingJobStatus; 2] {
        [TrainingJobStatus::Queued, TrainingJobStatus::Running]
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::H1
    }
}

/// Snapshot of the toggles shown on the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatusView {
    pub id: Option<i32>,
    pub mt5_connected: bool,
    pub ai_active: bool,
    pub risk_monitor_active: bool,
    pub degraded_mode: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Default for SystemStatusView {
    fn default() -> Self {
        Self {
            id: None,
            mt5_connected: false,
            ai_active: false,
            risk_monitor_active: false,
            degraded_mode: false,
            last_heartbeat: None,
        }
    }
}

/// One OHLC bar as served by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: usize,
    pub bars: Vec<HistoricalBar>,
}

/// Default training hyperparameters, overridable per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub epochs: u32,
    pub batch_size: u32,
    pub lookback_window: u32,
    pub validation_split: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            epochs: 100,
            batch_size: 32,
            lookback_window: 60,
            validation_split: 0.2,
        }
    }
}

impl Hyperparameters {
    /// Renders the defaults merged with caller-supplied keys. Unknown keys are kept.
    pub fn merged_with(&self, overrides: Option<&Map<String, Value>>) -> Value {
        let mut merged = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
        }
        Value::Object(merged)
    }
}

/// Metrics written onto a model once its simulated training run finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub loss: f64,
    pub sharpe_ratio: f64,
    pub epochs: u32,
    pub bars_used: i32,
    pub trained_at: DateTime<Utc>,
}

impl TrainingMetrics {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("connected".parse::<AccountStatus>(), Ok(AccountStatus::Connected));
        assert_eq!(ModelStatus::Training.as_str(), "training");
        assert_eq!(Timeframe::H4.to_string(), "4h");
        assert!("paused".parse::<ModelStatus>().is_err());
    }

    #[test]
    fn test_invalid_status_error_lists_choices() {
        let err = "online".parse::<AccountStatus>().unwrap_err();
        assert!(err.contains("connected, disconnected"));
    }

    #[test]
    fn test_hyperparameter_overrides_replace_defaults() {
        let mut overrides = Map::new();
        overrides.insert("epochs".to_string(), json!(250));
        overrides.insert("dropout".to_string(), json!(0.3));

        let merged = Hyperparameters::default().merged_with(Some(&overrides));

        assert_eq!(merged["epochs"], json!(250));
        assert_eq!(merged["dropout"], json!(0.3));
        assert_eq!(merged["batchSize"], json!(32));
    }

    #[test]
    fn test_timeframe_serializes_as_chart_label() {
        assert_eq!(serde_json::to_value(Timeframe::M15).unwrap(), json!("15m"));
        assert_eq!(Timeframe::default(), Timeframe::H1);
    }
}
