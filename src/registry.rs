//! Family Registry
//!
//! 船舶名からレイアウトファミリーを引くためのレジストリ。
//! カタログの`layout`宣言から構築し、必要に応じて独自の実装で上書きできます。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::families::LayoutFamily;

/// 船舶名 -> レイアウトファミリーの対応表
///
/// 船舶名は大文字小文字を区別せずに比較します。
#[derive(Clone, Default)]
pub struct FamilyRegistry {
    families: HashMap<String, Arc<dyn LayoutFamily>>,
}

impl FamilyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// カタログのレイアウト宣言から構築
    ///
    /// `layout`を宣言していない船舶は登録されません。
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut registry = Self::new();
        for boat in &catalog.boats {
            if let Some(layout) = &boat.layout {
                registry.register(&boat.name, layout.family());
            }
        }
        registry
    }

    /// ファミリーを登録（既存の登録は上書き）
    pub fn register(&mut self, vessel: &str, family: Arc<dyn LayoutFamily>) {
        self.families.insert(key(vessel), family);
    }

    /// 船舶のファミリーを取得
    pub fn get(&self, vessel: &str) -> Option<Arc<dyn LayoutFamily>> {
        self.families.get(&key(vessel)).cloned()
    }

    /// 登録済みの船舶数
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl fmt::Debug for FamilyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self
            .families
            .iter()
            .map(|(vessel, family)| (vessel.as_str(), family.name()))
            .collect();
        entries.sort();
        f.debug_map().entries(entries).finish()
    }
}

fn key(vessel: &str) -> String {
    vessel.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{RangeRows, RangeTable};

    #[test]
    fn test_from_catalog_registers_declared_layouts() {
        let catalog = Catalog::from_toml_str(
            r#"
            [[boat]]
            name = "El Rora"
            layout = { family = "range-rows" }

            [[boat]]
            name = "No Layout"
            "#,
        )
        .unwrap();

        let registry = FamilyRegistry::from_catalog(&catalog);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("el rora").unwrap().name(), RangeRows::default().name());
        assert!(registry.get("No Layout").is_none());
    }

    #[test]
    fn test_register_overrides_catalog() {
        let mut registry = FamilyRegistry::new();
        registry.register("El Rora", Arc::new(RangeRows::default()));
        registry.register(" EL RORA ", Arc::new(RangeTable::default()));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("El Rora").unwrap().name(), RangeTable::default().name());
    }
}
