// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Belief State

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::BeliefValue;

/// Per-agent belief record. Always complete: updates either replace both
/// fields or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    pub value: BeliefValue,
    pub justification: String,
}

impl BeliefState {
    pub fn new(value: impl Into<BeliefValue>, justification: impl Into<String>) -> Self {
        Self { value: value.into(), justification: justification.into() }
    }
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

/// JSON type a payload field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Whole numbers only; `3.0` does not qualify.
    Integer,
    Number,
    String,
    Bool,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
        }
    }
}

/// Expected payload shape: exact key set, one type per key.
pub type Schema = Vec<(String, FieldType)>;

/// Maps a payload onto a [`BeliefState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefSchema {
    pub value_field: String,
    pub value_type: FieldType,
    pub justification_field: String,
}

impl BeliefSchema {
    /// `{"guess": int, "reasoning": str}`, the debate game's payload.
    pub fn guess() -> Self {
        Self {
            value_field: "guess".into(),
            value_type: FieldType::Integer,
            justification_field: "reasoning".into(),
        }
    }

    /// `{"decision": int, "reasoning": str}`, the adoption game's payload.
    pub fn decision() -> Self {
        Self {
            value_field: "decision".into(),
            value_type: FieldType::Integer,
            justification_field: "reasoning".into(),
        }
    }

    pub fn fields(&self) -> Schema {
        vec![
            (self.value_field.clone(), self.value_type),
            (self.justification_field.clone(), FieldType::String),
        ]
    }

    /// Convert a payload that already passed [`crate::extract::extract_payloads`].
    /// Returns `None` if it does not fit this schema after all.
    pub fn parse(&self, payload: &Map<String, Value>) -> Option<BeliefState> {
        let raw = payload.get(&self.value_field)?;
        if !self.value_type.matches(raw) {
            return None;
        }
        let value = match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) if self.value_type == FieldType::Integer => BeliefValue::Integer(i),
                _ => BeliefValue::Number(n.as_f64()?),
            },
            Value::String(s) => BeliefValue::Text(s.clone()),
            Value::Bool(b) => BeliefValue::Integer(i64::from(*b)),
            _ => return None,
        };
        let justification = payload.get(&self.justification_field)?.as_str()?.to_string();
        Some(BeliefState { value, justification })
    }

    /// Render a state as the JSON object this schema accepts.
    pub fn render(&self, state: &BeliefState) -> Value {
        let mut map = Map::new();
        let value = match &state.value {
            BeliefValue::Integer(i) => Value::from(*i),
            BeliefValue::Number(f) => Value::from(*f),
            BeliefValue::Text(s) => Value::from(s.clone()),
        };
        map.insert(self.value_field.clone(), value);
        map.insert(self.justification_field.clone(), Value::from(state.justification.clone()));
        Value::Object(map)
    }
}

// ─── Utility Ledger (adoption game) ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityLedger {
    pub decision: Option<i64>,
    pub decision_old: Option<i64>,
    /// Last utility draw (0 or 1).
    pub utility_gained: u32,
    /// Running total of all draws.
    pub utility: u32,
}

impl UtilityLedger {
    pub fn starting_with(decision: Option<i64>) -> Self {
        Self { decision, decision_old: decision, ..Self::default() }
    }

    pub fn commit_decision(&mut self, decision: Option<i64>) {
        self.decision_old = self.decision;
        self.decision = decision;
    }

    pub fn record_draw(&mut self, gained: u32) {
        self.utility_gained = gained;
        self.utility += gained;
    }
}
