use crate::cmd::Project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use bitacora_core::{
    error::BitacoraError,
    fields::{FieldRegistry, FieldSpec, StageFields},
};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum FieldsSubcommand {
    /// Replace the fields a stage asks for in wizard step 3
    Set {
        stage: u32,
        /// Comma-separated required keys; `key:Label` sets a display label
        #[arg(long, default_value = "")]
        required: String,
        /// Comma-separated optional keys; `key:Label` sets a display label
        #[arg(long, default_value = "")]
        optional: String,
    },
    /// Show field configuration, for one stage or all
    Show { stage: Option<u32> },
}

pub fn run(root: &Path, subcmd: FieldsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        FieldsSubcommand::Set {
            stage,
            required,
            optional,
        } => set(root, stage, &required, &optional, json),
        FieldsSubcommand::Show { stage } => show(root, stage, json),
    }
}

fn parse_specs(list: &str) -> Vec<FieldSpec> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.split_once(':') {
            Some((key, label)) => FieldSpec {
                key: key.trim().to_string(),
                label: Some(label.trim().to_string()).filter(|l| !l.is_empty()),
            },
            None => FieldSpec::new(s),
        })
        .filter(|f| !f.key.is_empty())
        .collect()
}

fn set(root: &Path, stage: u32, required: &str, optional: &str, json: bool) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    if project.catalog.get(stage).is_none() {
        return Err(BitacoraError::StageNotFound(stage.to_string()).into());
    }
    let mut registry = FieldRegistry::load(root).context("failed to load stage fields")?;
    let fields = StageFields {
        stage_id: stage,
        required: parse_specs(required),
        optional: parse_specs(optional),
    };
    registry.set(fields.clone());
    registry.save(root).context("failed to save stage fields")?;

    if json {
        print_json(&fields)?;
    } else {
        println!(
            "Stage {stage}: {} required, {} optional field(s)",
            fields.required.len(),
            fields.optional.len()
        );
    }
    Ok(())
}

fn show(root: &Path, stage: Option<u32>, json: bool) -> anyhow::Result<()> {
    let registry = FieldRegistry::load(root).context("failed to load stage fields")?;
    let selected: Vec<&StageFields> = registry
        .stages
        .iter()
        .filter(|s| stage.map_or(true, |id| s.stage_id == id))
        .collect();

    if json {
        return print_json(&selected);
    }
    if selected.is_empty() {
        println!("No stage fields configured.");
        return Ok(());
    }
    let mut rows = Vec::new();
    for s in selected {
        let tagged = s
            .required
            .iter()
            .map(|f| (f, "required"))
            .chain(s.optional.iter().map(|f| (f, "optional")));
        for (f, kind) in tagged {
            rows.push(vec![
                s.stage_id.to_string(),
                f.key.clone(),
                f.display_name().to_string(),
                kind.to_string(),
            ]);
        }
    }
    print_table(&["STAGE", "KEY", "LABEL", "KIND"], rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_with_and_without_labels() {
        let specs = parse_specs(" quote:Monto cotizado, vendor ,, :x");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].key, "quote");
        assert_eq!(specs[0].display_name(), "Monto cotizado");
        assert_eq!(specs[1].key, "vendor");
        assert_eq!(specs[1].label, None);
    }
}
