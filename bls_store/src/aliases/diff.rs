use std::{collections::BTreeSet, fmt};

/// `(alias, series_id)` row of `bls_aliases`.
pub type AliasPair = (String, String);

/// What needs to change to make `bls_aliases` match a mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasDiff {
    /// Series IDs referenced by the file but missing from `bls_series`.
    pub series_stubs: BTreeSet<String>,
    pub aliases_insert: BTreeSet<AliasPair>,
    /// Only filled when pruning.
    pub aliases_delete: BTreeSet<AliasPair>,
}

impl AliasDiff {
    /// Builds the diff from the wanted pairs, the stored pairs and the stored series IDs.
    pub fn compute(
        wanted: &BTreeSet<AliasPair>,
        current: &BTreeSet<AliasPair>,
        known_series: &BTreeSet<String>,
        prune: bool,
    ) -> Self {
        let aliases_insert: BTreeSet<AliasPair> = wanted.difference(current).cloned().collect();
        let series_stubs = aliases_insert
            .iter()
            .map(|(_, s)| s)
            .filter(|s| !known_series.contains(*s))
            .cloned()
            .collect();
        let aliases_delete = if prune {
            current.difference(wanted).cloned().collect()
        } else {
            BTreeSet::new()
        };
        Self {
            series_stubs,
            aliases_insert,
            aliases_delete,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.series_stubs.is_empty() && self.aliases_insert.is_empty() && self.aliases_delete.is_empty()
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str, first: &mut bool) -> fmt::Result {
    if !*first {
        writeln!(f)?;
    }
    *first = false;
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.len()))
}

impl fmt::Display for AliasDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return writeln!(f, "No changes");
        }
        let mut first = true;

        if !self.series_stubs.is_empty() {
            heading(f, "Series (INSERT)", &mut first)?;
            for id in &self.series_stubs {
                writeln!(f, "+ {id}")?;
            }
        }
        if !self.aliases_insert.is_empty() {
            heading(f, "Aliases (INSERT)", &mut first)?;
            for (alias, id) in &self.aliases_insert {
                writeln!(f, "+ {alias} -> {id}")?;
            }
        }
        if !self.aliases_delete.is_empty() {
            heading(f, "Aliases (DELETE)", &mut first)?;
            for (alias, id) in &self.aliases_delete {
                writeln!(f, "- {alias} -> {id}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> BTreeSet<AliasPair> {
        items.iter().map(|(a, s)| (a.to_string(), s.to_string())).collect()
    }

    #[test]
    fn prune_controls_deletes() {
        let wanted = pairs(&[("cpi", "CUUR0000SA0"), ("core", "CUUR0000SA0L1E")]);
        let current = pairs(&[("cpi", "CUUR0000SA0"), ("gone", "CUUR0000SAF1")]);
        let known: BTreeSet<String> = ["CUUR0000SA0".to_string()].into();

        let keep = AliasDiff::compute(&wanted, &current, &known, false);
        assert_eq!(keep.aliases_insert, pairs(&[("core", "CUUR0000SA0L1E")]));
        assert!(keep.aliases_delete.is_empty());
        assert_eq!(keep.series_stubs, ["CUUR0000SA0L1E".to_string()].into());

        let pruned = AliasDiff::compute(&wanted, &current, &known, true);
        assert_eq!(pruned.aliases_delete, pairs(&[("gone", "CUUR0000SAF1")]));
    }

    #[test]
    fn empty_diff_prints_no_changes() {
        let diff = AliasDiff::default();
        assert!(diff.is_noop());
        assert_eq!(diff.to_string(), "No changes\n");
    }
}
