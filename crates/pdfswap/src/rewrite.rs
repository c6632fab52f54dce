//! Applying rules across the text layers of several pages.

use pdfswap_core::{MatchScope, ReplaceReport, Rule};
use pdfswap_parse::{TextLayer, TextUnit};

/// Apply `rules` to `layers`, using `scope` as the match space.
///
/// With [`MatchScope::Document`] all pages form one buffer, so a match may
/// start on one page and end on the next. With [`MatchScope::Page`] every
/// page is matched on its own and the counts are summed.
pub fn apply_to_layers(layers: &mut [TextLayer], rules: &[Rule], scope: MatchScope) -> ReplaceReport {
    match scope {
        MatchScope::Document => {
            let mut cells: Vec<&mut TextUnit> = layers
                .iter_mut()
                .flat_map(|layer| layer.units_mut().iter_mut())
                .collect();
            pdfswap_core::apply_rules(&mut cells, rules)
        }
        MatchScope::Page => {
            let mut report = ReplaceReport {
                matches: vec![0; rules.len()],
            };
            for layer in layers {
                report.merge(&pdfswap_core::apply_rules(layer.units_mut(), rules));
            }
            report
        }
    }
}
