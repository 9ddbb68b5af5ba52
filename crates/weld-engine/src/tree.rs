use uuid::Uuid;
use weld_types::WeldConfig;

use crate::types::{BodyProperties, EngineError, FeatureList, WeldFeature};

impl FeatureList {
    /// Append a feature and return its id.
    pub fn add_feature(&mut self, name: String, config: WeldConfig) -> Uuid {
        let id = Uuid::new_v4();
        self.features.push(WeldFeature {
            id,
            name,
            config,
            suppressed: false,
            properties: BodyProperties::default(),
        });
        id
    }

    /// Remove a feature by ID. Returns the removed feature.
    pub fn remove_feature(&mut self, id: Uuid) -> Result<WeldFeature, EngineError> {
        let pos = self
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        Ok(self.features.remove(pos))
    }

    /// Move a feature to a new position in evaluation order.
    pub fn reorder_feature(&mut self, id: Uuid, new_pos: usize) -> Result<(), EngineError> {
        let old_pos = self
            .feature_index(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        let feature = self.features.remove(old_pos);
        let clamped_pos = new_pos.min(self.features.len());
        self.features.insert(clamped_pos, feature);
        Ok(())
    }

    pub fn set_suppressed(&mut self, id: Uuid, suppressed: bool) -> Result<(), EngineError> {
        self.find_feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?
            .suppressed = suppressed;
        Ok(())
    }

    pub fn find_feature(&self, id: Uuid) -> Option<&WeldFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn find_feature_mut(&mut self, id: Uuid) -> Option<&mut WeldFeature> {
        self.features.iter_mut().find(|f| f.id == id)
    }

    pub fn feature_index(&self, id: Uuid) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    /// Next default feature name, e.g. "Weld feature 3".
    pub fn next_name(&self) -> String {
        format!("Weld feature {}", self.features.len() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_types::KernelId;

    fn config() -> WeldConfig {
        WeldConfig::fillet(4.0, vec![KernelId(1)], vec![KernelId(2)])
    }

    #[test]
    fn reorder_clamps_to_the_end() {
        let mut list = FeatureList::new();
        let a = list.add_feature("a".into(), config());
        let b = list.add_feature("b".into(), config());
        list.reorder_feature(a, 10).unwrap();
        assert_eq!(list.feature_index(a), Some(1));
        assert_eq!(list.feature_index(b), Some(0));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut list = FeatureList::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            list.remove_feature(missing),
            Err(EngineError::FeatureNotFound { id }) if id == missing
        ));
        assert!(list.set_suppressed(missing, true).is_err());
    }

    #[test]
    fn default_names_count_up() {
        let mut list = FeatureList::new();
        assert_eq!(list.next_name(), "Weld feature 1");
        list.add_feature(list.next_name(), config());
        assert_eq!(list.next_name(), "Weld feature 2");
    }
}
