use crate::config::NamingConfig;
use crate::state::{ElementMap, Elements};

/// Store-wide name lookup used to keep dev names and labels unique.
pub trait NameLookup {
    /// Dev names are compared case-insensitively.
    fn is_dev_name_in_store(&self, name: &str) -> bool;
    fn is_label_in_store(&self, label: &str) -> bool;
}

impl NameLookup for ElementMap {
    fn is_dev_name_in_store(&self, name: &str) -> bool {
        self.values()
            .filter_map(|element| element.name.as_deref())
            .any(|existing| existing.eq_ignore_ascii_case(name))
    }

    fn is_label_in_store(&self, label: &str) -> bool {
        self.values()
            .filter_map(|element| element.label.as_deref())
            .any(|existing| existing == label)
    }
}

impl NameLookup for Elements {
    fn is_dev_name_in_store(&self, name: &str) -> bool {
        self.map().is_dev_name_in_store(name)
    }

    fn is_label_in_store(&self, label: &str) -> bool {
        self.map().is_label_in_store(label)
    }
}

/// Hands out dev names and labels that collide neither with the store nor with
/// anything handed out earlier in the same batch.
///
/// A free proposal is kept as-is. Otherwise dev names become `{name}_{n}` and labels
/// follow the configured copy template, `n` counting up from 0.
pub struct UniqueNamer<'a> {
    lookup: &'a dyn NameLookup,
    config: &'a NamingConfig,
    used_dev_names: Vec<String>,
    used_labels: Vec<String>,
}

impl<'a> UniqueNamer<'a> {
    pub fn new(lookup: &'a dyn NameLookup, config: &'a NamingConfig) -> Self {
        Self {
            lookup,
            config,
            used_dev_names: Vec::new(),
            used_labels: Vec::new(),
        }
    }

    pub fn dev_name(&mut self, proposed: &str) -> String {
        let max = self.config.max_dev_name_length;
        let first = truncate_chars(proposed, max);
        let name = if self.dev_name_taken(&first) {
            (0..)
                .map(|n| {
                    let suffix = format!("_{n}");
                    let base = truncate_chars(proposed, max.saturating_sub(suffix.chars().count()));
                    format!("{base}{suffix}")
                })
                .find(|candidate| !self.dev_name_taken(candidate))
                .unwrap_or(first)
        } else {
            first
        };
        self.used_dev_names.push(name.clone());
        name
    }

    pub fn label(&mut self, proposed: &str) -> String {
        let max = self.config.max_label_length;
        let first = truncate_chars(proposed, max);
        let label = if self.label_taken(&first) {
            (0..)
                .map(|n| self.copy_label(proposed, n))
                .find(|candidate| !self.label_taken(candidate))
                .unwrap_or(first)
        } else {
            first
        };
        self.used_labels.push(label.clone());
        label
    }

    /// Records names kept verbatim (cut-paste) so later proposals avoid them.
    pub fn reserve(&mut self, name: Option<&str>, label: Option<&str>) {
        if let Some(name) = name {
            self.used_dev_names.push(name.to_string());
        }
        if let Some(label) = label {
            self.used_labels.push(label.to_string());
        }
    }

    fn dev_name_taken(&self, name: &str) -> bool {
        self.lookup.is_dev_name_in_store(name)
            || self
                .used_dev_names
                .iter()
                .any(|used| used.eq_ignore_ascii_case(name))
    }

    fn label_taken(&self, label: &str) -> bool {
        self.lookup.is_label_in_store(label) || self.used_labels.iter().any(|used| used == label)
    }

    /// Renders the `n`th copy label within the length limit. When the template
    /// leaves no room for the label, falls back to `{label}{n}`.
    fn copy_label(&self, proposed: &str, n: usize) -> String {
        let max = self.config.max_label_length;
        let overhead = self.render_copy_label("", n).chars().count();
        if overhead < max {
            let base = truncate_chars(proposed, max - overhead);
            return self.render_copy_label(&base, n);
        }
        let counter = n.to_string();
        let base = truncate_chars(proposed, max.saturating_sub(counter.chars().count()));
        format!("{base}{counter}")
    }

    fn render_copy_label(&self, label: &str, n: usize) -> String {
        let template = &self.config.copy_label_template;
        let rendered = template.replace("{label}", label).replace("{n}", &n.to_string());
        if template.contains("{n}") {
            rendered
        } else {
            format!("{rendered} {n}")
        }
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowElement;

    fn store(labels: &[(&str, &str)]) -> Elements {
        labels
            .iter()
            .enumerate()
            .map(|(i, (name, label))| {
                FlowElement::new(format!("e{i}"), "Assignment")
                    .with_name(*name)
                    .with_label(*label)
            })
            .collect()
    }

    #[test]
    fn free_proposals_are_kept() {
        let elements = store(&[]);
        let config = NamingConfig::default();
        let mut namer = UniqueNamer::new(&elements, &config);
        assert_eq!(namer.dev_name("Step"), "Step");
        assert_eq!(namer.label("Step"), "Step");
    }

    #[test]
    fn collisions_skip_store_and_batch_names() {
        let elements = store(&[("my_step", "My Step"), ("other", "My Step 0 copy")]);
        let config = NamingConfig::default();
        let mut namer = UniqueNamer::new(&elements, &config);

        assert_eq!(namer.label("My Step"), "My Step 1 copy");
        assert_eq!(namer.label("My Step"), "My Step 2 copy");
        assert_eq!(namer.dev_name("My_Step"), "My_Step_0");
        assert_eq!(namer.dev_name("My_Step"), "My_Step_1");
    }

    #[test]
    fn long_names_are_truncated_to_fit_the_suffix() {
        let elements = store(&[("abcdefghij", "abcdefghij")]);
        let config = NamingConfig {
            max_label_length: 12,
            max_dev_name_length: 10,
            ..NamingConfig::default()
        };
        let mut namer = UniqueNamer::new(&elements, &config);

        let name = namer.dev_name("abcdefghij");
        assert_eq!(name, "abcdefgh_0");
        let label = namer.label("abcdefghij");
        assert!(label.chars().count() <= 12);
        assert!(label.ends_with(" 0 copy"));
    }

    #[test]
    fn templates_without_a_counter_still_produce_distinct_labels() {
        let elements = store(&[("x", "X")]);
        let config = NamingConfig {
            copy_label_template: "Copy of {label}".to_string(),
            ..NamingConfig::default()
        };
        let mut namer = UniqueNamer::new(&elements, &config);

        assert_eq!(namer.label("X"), "Copy of X 0");
        assert_eq!(namer.label("X"), "Copy of X 1");
    }

    #[test]
    fn labels_stay_within_the_limit_when_the_template_is_too_long() {
        let elements = store(&[("step", "Step")]);
        let config = NamingConfig {
            max_label_length: 4,
            ..NamingConfig::default()
        };
        let mut namer = UniqueNamer::new(&elements, &config);

        assert_eq!(namer.label("Step"), "Ste0");
        assert_eq!(namer.label("Step"), "Ste1");
    }
}
