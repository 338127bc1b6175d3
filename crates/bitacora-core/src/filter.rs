use crate::config::LifecycleConfig;
use crate::development::Development;
use crate::stage::StageResolver;
use crate::types::same_text;

/// Listing criteria for developments. Every set field must match; text
/// comparisons ignore case.
#[derive(Debug, Clone, Default)]
pub struct DevelopmentFilter {
    pub status: Option<String>,
    pub stage: Option<u32>,
    pub provider: Option<String>,
    pub responsible: Option<String>,
    /// Substring matched against id, name and description.
    pub search: Option<String>,
    pub include_cancelled: bool,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ci(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| same_text(a, b))
}

impl DevelopmentFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.stage.is_none()
            && self.provider.is_none()
            && self.responsible.is_none()
            && self.search.is_none()
    }

    pub fn matches(&self, dev: &Development, lifecycle: &LifecycleConfig) -> bool {
        let resolver = StageResolver::from_config(lifecycle);
        if !self.include_cancelled && self.status.is_none() && dev.is_cancelled(lifecycle) {
            return false;
        }
        if let Some(status) = &self.status {
            if !eq_ci(Some(dev.status.as_str()), status) {
                return false;
            }
        }
        if let Some(stage) = self.stage {
            if dev.stage_index(&resolver) != stage {
                return false;
            }
        }
        if let Some(provider) = &self.provider {
            if !eq_ci(dev.provider.as_deref(), provider) {
                return false;
            }
        }
        if let Some(responsible) = &self.responsible {
            if !eq_ci(dev.responsible.as_deref(), responsible) {
                return false;
            }
        }
        if let Some(q) = &self.search {
            let hit = contains_ci(&dev.id, q)
                || contains_ci(&dev.name, q)
                || dev
                    .description
                    .as_deref()
                    .map(|d| contains_ci(d, q))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Matching developments ordered by stage, then name.
    pub fn apply<'a>(
        &self,
        devs: &'a [Development],
        lifecycle: &LifecycleConfig,
    ) -> Vec<&'a Development> {
        let resolver = StageResolver::from_config(lifecycle);
        let mut out: Vec<&Development> = devs
            .iter()
            .filter(|d| self.matches(d, lifecycle))
            .collect();
        out.sort_by(|a, b| {
            a.stage_index(&resolver)
                .cmp(&b.stage_index(&resolver))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageCatalog;

    fn dev(id: &str, name: &str, stage: u32, status: &str, provider: Option<&str>) -> Development {
        let mut d = Development::new(id, name);
        d.set_stage(stage, &StageCatalog::default());
        d.status = status.to_string();
        d.provider = provider.map(str::to_string);
        d
    }

    fn sample() -> Vec<Development> {
        vec![
            dev("DEV-1", "Portal clientes", 6, "activo", Some("Acme")),
            dev("DEV-2", "app móvil", 2, "activo", Some("Globex")),
            dev("DEV-3", "Billing", 6, "en pausa", Some("acme")),
            dev("DEV-4", "Archivo", 11, "cancelado", None),
        ]
    }

    fn ids(v: Vec<&Development>) -> Vec<&str> {
        v.into_iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_hides_cancelled_and_sorts() {
        let devs = sample();
        let lc = LifecycleConfig::default();
        let f = DevelopmentFilter::default();
        assert!(f.is_empty());
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-2", "DEV-3", "DEV-1"]);

        let all = DevelopmentFilter { include_cancelled: true, ..Default::default() };
        assert_eq!(all.apply(&devs, &lc).len(), 4);
    }

    #[test]
    fn filters_combine() {
        let devs = sample();
        let lc = LifecycleConfig::default();
        let f = DevelopmentFilter {
            stage: Some(6),
            provider: Some("ACME".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-3", "DEV-1"]);

        let f = DevelopmentFilter {
            stage: Some(6),
            status: Some("activo".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-1"]);
    }

    #[test]
    fn explicit_cancelled_status_shows_cancelled() {
        let devs = sample();
        let lc = LifecycleConfig::default();
        let f = DevelopmentFilter {
            status: Some("Cancelado".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-4"]);
    }

    #[test]
    fn search_matches_id_and_name() {
        let devs = sample();
        let lc = LifecycleConfig::default();
        let f = DevelopmentFilter {
            search: Some("PORTAL".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-1"]);
        let f = DevelopmentFilter {
            search: Some("dev-2".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(f.apply(&devs, &lc)), vec!["DEV-2"]);
    }
}
