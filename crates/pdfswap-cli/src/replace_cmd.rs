use pdfswap::{NameSwap, PdfError, RewriteOptions, Rule, SearchOptions};

use crate::cli::{OutputFormat, ReplaceArgs};
use crate::config::{NameMap, read_name_map, write_name_map};
use crate::shared::{fail, open_pdf, print_warnings};

pub fn run(args: &ReplaceArgs) -> Result<(), i32> {
    let config = match &args.read_config {
        Some(path) => read_name_map(path).map_err(fail)?,
        None => NameMap::new(),
    };
    if let Some(path) = &args.write_config {
        write_name_map(path, &merged_names(&config, args)).map_err(fail)?;
    }

    let rules = build_rules(&name_pairs(&config, args), args).map_err(fail)?;
    if rules.is_empty() {
        return Err(fail(
            "no rules given (use --name, --literal, --regex or --read-config)",
        ));
    }

    let options = RewriteOptions {
        strict_mode: args.strict,
        match_scope: args.scope.to_match_scope(),
        ..RewriteOptions::default()
    };
    let mut pdf = open_pdf(&args.input, Some(options))?;
    let result = pdf.rewrite(&rules).map_err(fail)?;
    print_warnings(&result.warnings);
    pdf.save(&args.output).map_err(fail)?;

    let summary = result.value;
    match args.format {
        OutputFormat::Text => {
            for (rule, count) in rules.iter().zip(&summary.report.matches) {
                println!("{}: {count} match(es)", rule.label());
            }
            println!(
                "{} page(s) rewritten, saved to {}",
                summary.pages_rewritten.len(),
                args.output.display()
            );
        }
        OutputFormat::Json => {
            let rule_counts: Vec<_> = rules
                .iter()
                .zip(&summary.report.matches)
                .map(|(rule, count)| {
                    serde_json::json!({
                        "rule": rule.label(),
                        "matches": count,
                    })
                })
                .collect();
            let pages: Vec<usize> = summary.pages_rewritten.iter().map(|p| p + 1).collect();
            let obj = serde_json::json!({
                "rules": rule_counts,
                "total": summary.report.total(),
                "pages_rewritten": pages,
                "warnings": result.warnings,
                "output": args.output.display().to_string(),
            });
            println!("{obj}");
        }
    }
    Ok(())
}

/// Config names merged with `--name` pairs; a `--name` wins over a config
/// entry for the same old name.
fn merged_names(config: &NameMap, args: &ReplaceArgs) -> NameMap {
    let mut names = config.clone();
    names.extend(args.names.iter().cloned());
    names
}

/// Name swaps in application order: config entries not overridden by a
/// `--name`, then `--name` pairs as given.
fn name_pairs<'a>(config: &'a NameMap, args: &'a ReplaceArgs) -> Vec<(&'a str, &'a str)> {
    let overridden = |old: &str| args.names.iter().any(|(name, _)| name == old);
    config
        .iter()
        .filter(|(old, _)| !overridden(old))
        .chain(args.names.iter().map(|(old, new)| (old, new)))
        .map(|(old, new)| (old.as_str(), new.as_str()))
        .collect()
}

/// Rules in application order: name swaps, literals, then regexes.
fn build_rules(names: &[(&str, &str)], args: &ReplaceArgs) -> Result<Vec<Rule>, PdfError> {
    let mut rules = Vec::new();
    for swap in NameSwap::from_pairs(names.iter().copied())? {
        rules.push(swap.to_rule()?);
    }
    for (find, replacement) in &args.literals {
        rules.push(Rule::literal(find, replacement)?);
    }
    let options = SearchOptions {
        regex: true,
        case_sensitive: args.case_sensitive,
    };
    for (pattern, replacement) in &args.regexes {
        rules.push(Rule::regex(pattern, replacement, &options)?);
    }
    Ok(rules)
}
