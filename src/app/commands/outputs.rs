use std::collections::BTreeMap;

use crate::domain::AppError;
use crate::ports::StateStore;

/// Exported outputs recorded by the last successful apply.
pub fn execute(store: &impl StateStore) -> Result<BTreeMap<String, String>, AppError> {
    Ok(store.load()?.outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::domain::DeploymentState;

    #[test]
    fn reads_recorded_outputs() {
        let store = MemoryStateStore::new();
        assert!(execute(&store).unwrap().is_empty());

        let mut state = DeploymentState::default();
        state.outputs.insert("api_gateway_id".into(), "a1b2c3d4e5".into());
        store.save(&state).unwrap();
        assert_eq!(execute(&store).unwrap()["api_gateway_id"], "a1b2c3d4e5");
    }
}
