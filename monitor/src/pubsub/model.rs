use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Latest payload per topic plus a bounded history of everything published.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BridgeState {
    pub topics: HashMap<String, Value>,
    pub history: VecDeque<Value>,
    #[serde(skip)]
    history_limit: usize,
}

impl BridgeState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            topics: HashMap::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    pub fn push(&mut self, topic: &str, payload: Value) {
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(payload.clone());
        }
        self.topics.insert(topic.to_string(), payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_is_bounded() {
        let mut state = BridgeState::new(2);
        for n in 0..5 {
            state.push("traffic/data", json!({ "vehicle_count": n }));
        }
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0]["vehicle_count"], 3);
        assert_eq!(state.topics["traffic/data"]["vehicle_count"], 4);
    }
}
