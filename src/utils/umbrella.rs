use crate::model::InstalledModule;
use std::collections::HashSet;

/// Hides `<umbrella>.<anything>` submodules when the umbrella module itself
/// is present, e.g. `Az.Storage` disappears once `Az` is installed.
#[derive(Debug, Clone)]
pub struct UmbrellaFilter {
    umbrellas: Vec<String>,
}

impl UmbrellaFilter {
    pub fn new<S: AsRef<str>>(umbrellas: &[S]) -> Self {
        Self {
            umbrellas: umbrellas
                .iter()
                .map(|u| u.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// The umbrella hiding `name`, if one is listed in `present` (lowercased names).
    fn covering(&self, name: &str, present: &HashSet<String>) -> Option<&str> {
        let lowered = name.to_ascii_lowercase();
        self.umbrellas
            .iter()
            .find(|umbrella| {
                lowered.len() > umbrella.len() + 1
                    && lowered.starts_with(umbrella.as_str())
                    && lowered.as_bytes()[umbrella.len()] == b'.'
                    && present.contains(umbrella.as_str())
            })
            .map(String::as_str)
    }

    pub fn apply(&self, modules: Vec<InstalledModule>) -> Vec<InstalledModule> {
        let present: HashSet<String> = modules
            .iter()
            .map(|m| m.name.to_ascii_lowercase())
            .collect();
        modules
            .into_iter()
            .filter(|m| self.covering(&m.name, &present).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, version: &str) -> InstalledModule {
        InstalledModule {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    #[test]
    fn umbrella_hides_its_submodules() {
        let filter = UmbrellaFilter::new(&["Az", "Microsoft.Graph"]);
        let shown = filter.apply(vec![module("Az.Storage", "1.0"), module("Az", "2.0")]);
        let names: Vec<_> = shown.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Az"]);
    }

    #[test]
    fn submodules_stay_without_their_umbrella() {
        let filter = UmbrellaFilter::new(&["Az"]);
        let shown = filter.apply(vec![module("Az.Storage", "1.0"), module("Az.Accounts", "3.0")]);
        assert_eq!(shown.len(), 2);
    }

    #[test]
    fn umbrella_itself_and_lookalikes_are_kept() {
        let filter = UmbrellaFilter::new(&["Microsoft.Graph"]);
        let shown = filter.apply(vec![
            module("Microsoft.Graph", "2.19.0"),
            module("microsoft.graph.users", "2.19.0"),
            module("Microsoft.GraphExtras", "0.1"),
            module("Microsoft.Graph.", "0.1"),
        ]);
        let names: Vec<_> = shown.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Microsoft.Graph", "Microsoft.GraphExtras", "Microsoft.Graph."]
        );
    }
}
