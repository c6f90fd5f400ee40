//! Module providing JSON IO for Models, in the COBRA JSON format
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::io::gpr_parse::{parse_gpr, GprParseError};
use crate::metabolic_model::gene::{Annotation, Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity, ReactionBuilder, ReactionBuilderError};

// region JSON Model
/// Represents a JSON serialized model, used for reading and writing models in json format
#[derive(Serialize, Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    genes: Vec<JsonGene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compartments: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    compartment: Option<String>,
    #[serde(default)]
    charge: Option<i32>,
    #[serde(default)]
    formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    #[serde(default)]
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    lower_bound: f64,
    upper_bound: f64,
    #[serde(default)]
    gene_reaction_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    objective_coefficient: Option<f64>,
    #[serde(default)]
    subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonGene {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<Value>,
}
// endregion JSON Model

// region Conversions
/// Convert a JSON annotation object into an [`Annotation`]
///
/// Values are either a single entry or a list of entries; numbers are kept in their textual
/// form, anything else is ignored.
fn annotation_from_value(value: Option<Value>) -> Annotation {
    let mut annotation = Annotation::new();
    if let Some(Value::Object(map)) = value {
        for (key, val) in map {
            let values: Vec<String> = match val {
                Value::String(s) => vec![s],
                Value::Number(n) => vec![n.to_string()],
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
                _ => continue,
            };
            annotation.insert(key, values);
        }
    }
    annotation
}

/// Convert an [`Annotation`] back into a JSON object, None if it is empty
fn annotation_to_value(annotation: &Annotation) -> Option<Value> {
    if annotation.is_empty() {
        return None;
    }
    Some(Value::Object(
        annotation
            .iter()
            .map(|(k, v)| {
                let values = v.iter().cloned().map(Value::String).collect();
                (k.clone(), Value::Array(values))
            })
            .collect(),
    ))
}

/// Notes are loosely structured, so they are kept as their JSON text
fn notes_from_value(value: Option<Value>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn notes_to_value(notes: &Option<String>) -> Option<Value> {
    notes
        .clone()
        .map(|n| serde_json::from_str(&n).unwrap_or(Value::String(n)))
}

impl From<JsonGene> for Gene {
    fn from(g: JsonGene) -> Self {
        Self {
            id: g.id,
            name: g.name,
            activity: GeneActivity::Active, // All genes start as active
            notes: notes_from_value(g.notes),
            annotation: annotation_from_value(g.annotation),
        }
    }
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
            notes: notes_from_value(m.notes),
            annotation: annotation_from_value(m.annotation),
        }
    }
}

impl From<&Gene> for JsonGene {
    fn from(g: &Gene) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            notes: notes_to_value(&g.notes),
            annotation: annotation_to_value(&g.annotation),
        }
    }
}

impl From<&Metabolite> for JsonMetabolite {
    fn from(m: &Metabolite) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            compartment: m.compartment.clone(),
            charge: Some(m.charge),
            formula: m.formula.clone(),
            notes: notes_to_value(&m.notes),
            annotation: annotation_to_value(&m.annotation),
        }
    }
}

impl Model {
    /// Read a model stored in the COBRA JSON format
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = fs::read_to_string(path.as_ref()).map_err(|err| {
            JsonError::UnableToRead(format!("{}: {}", path.as_ref().display(), err))
        })?;
        Model::from_json_str(&model_str)
    }

    /// Parse a model from a string holding the COBRA JSON format
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model = serde_json::from_str::<JsonModel>(model_str)
            .map_err(|err| JsonError::UnableToParse(err.to_string()))?;
        Model::from_json(json_model)
    }

    /// Write the model in the COBRA JSON format
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let json_model = self.to_json();
        let model_string = serde_json::to_string(&json_model)?;
        fs::write(path, model_string)?;
        Ok(())
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        model.id = json_model.id;
        model.compartments = json_model.compartments;
        model.version = json_model.version;
        // Start by converting the genes and metabolites using the From methods
        for g in json_model.genes {
            model.add_gene(Gene::from(g));
        }
        for m in json_model.metabolites {
            model.add_metabolite(Metabolite::from(m));
        }
        // Now, iterate through the reactions, parsing GPRs, and adding to the objective
        for rxn in json_model.reactions {
            let gpr = if !rxn.gene_reaction_rule.trim().is_empty() {
                Some(parse_gpr(&rxn.gene_reaction_rule, &mut model.genes)?)
            } else {
                None
            };
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .gpr(gpr)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .subsystem(rxn.subsystem)
                .notes(notes_from_value(rxn.notes))
                .annotation(annotation_from_value(rxn.annotation))
                .activity(ReactionActivity::Active)
                .build()?;
            model.add_reaction(new_reaction);
            // Add the reaction to the objective function if desired
            if let Some(coef) = rxn.objective_coefficient {
                if coef != 0. {
                    model.objective.insert(rxn.id, coef);
                }
            }
        }
        Ok(model)
    }

    fn to_json(&self) -> JsonModel {
        JsonModel {
            metabolites: self.metabolites.values().map(JsonMetabolite::from).collect(),
            reactions: self
                .reactions
                .values()
                .map(|r| self.reaction_to_json(r))
                .collect(),
            genes: self.genes.values().map(JsonGene::from).collect(),
            id: self.id.clone(),
            compartments: self.compartments.clone(),
            version: self.version.clone(),
        }
    }

    fn reaction_to_json(&self, r: &Reaction) -> JsonReaction {
        JsonReaction {
            id: r.id.clone(),
            name: r.name.clone(),
            metabolites: r.metabolites.clone(),
            lower_bound: r.lower_bound,
            upper_bound: r.upper_bound,
            gene_reaction_rule: r
                .gpr
                .as_ref()
                .map(|rule| rule.to_string_id())
                .unwrap_or_default(),
            objective_coefficient: self.objective.get(&r.id).copied(),
            subsystem: r.subsystem.clone(),
            notes: notes_to_value(&r.notes),
            annotation: annotation_to_value(&r.annotation),
        }
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to parse a GPR rule during conversion from JSON: {0}")]
    GprParserError(#[from] GprParseError),
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Unable to build reaction: {0}")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Serde json error: {0}")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to write to file: {0}")]
    UnableToWrite(#[from] std::io::Error),
}

// endregion Conversions

#[cfg(test)]
mod json_tests {
    use super::*;
    use std::path::PathBuf;

    fn toy_model_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("toy_model.json")
    }

    #[test]
    fn json_reaction() {
        let data = r#"{
"id":"PFK",
"name":"Phosphofructokinase",
"metabolites":{
"adp_c":1.0,
"atp_c":-1.0,
"f6p_c":-1.0,
"fdp_c":1.0,
"h_c":1.0
},
"lower_bound":0.0,
"upper_bound":1000.0,
"gene_reaction_rule":"b3916 or b1723",
"subsystem":"Glycolysis/Gluconeogenesis",
"annotation":{
"ec-code":[
"2.7.1.11"
],
"sbo":"SBO:0000176"
}
}"#;
        let reaction: JsonReaction = serde_json::from_str(data).unwrap();
        assert_eq!(reaction.id, "PFK");
        assert_eq!(reaction.name.unwrap(), "Phosphofructokinase");
        assert!((reaction.metabolites["atp_c"] + 1.0).abs() < 1e-25);
        assert!((reaction.lower_bound - 0.0).abs() < 1e-25);
        assert!((reaction.upper_bound - 1000.0).abs() < 1e-25);
        assert_eq!(reaction.gene_reaction_rule, "b3916 or b1723");
        let annotation = annotation_from_value(reaction.annotation);
        assert_eq!(annotation["ec-code"], vec!["2.7.1.11"]);
        assert_eq!(annotation["sbo"], vec!["SBO:0000176"]);
    }

    #[test]
    fn gene_conversion() {
        let data = r#"
        {
"id":"b1241",
"name":"adhE",
"notes":{
"original_bigg_ids":[
"b1241"
]
},
"annotation":{
"ncbigene":[
"945837"
],
"refseq_synonym":[
"JW1228",
"ECK1235"
],
"sbo":"SBO:0000243",
"uniprot":[
"P0A9Q7"
]
}
}
        "#;
        let json_gene: JsonGene = serde_json::from_str(data).unwrap();
        let gene = Gene::from(json_gene);
        assert_eq!(gene.id, "b1241");
        assert_eq!(gene.name.clone().unwrap(), "adhE");
        assert_eq!(gene.annotation_value("ncbigene"), "945837");
        assert_eq!(gene.annotation_value("refseq_synonym"), "JW1228,ECK1235");
        assert_eq!(gene.annotation_value("sbo"), "SBO:0000243");
        assert!(gene.notes.unwrap().contains("original_bigg_ids"));
    }

    #[test]
    fn read_json() {
        let model = Model::read_json(toy_model_path()).unwrap();
        assert_eq!(model.id.clone().unwrap(), "toy");
        assert_eq!(model.reactions.len(), 7);
        assert_eq!(model.metabolites.len(), 4);
        assert_eq!(model.genes.len(), 5);
        assert_eq!(model.objective.get("BIOMASS"), Some(&1.0));

        let r3 = &model.reactions["R3"];
        assert_eq!(r3.gene_ids(), vec!["g3", "g4"]);
        assert_eq!(r3.bounds(), (0., 6.));
        assert!(model.reactions["R4"].is_reversible());
        assert_eq!(model.genes["g1"].annotation_value("uniprot"), "P00001");
    }

    #[test]
    fn write_and_read_back() {
        let model = Model::read_json(toy_model_path()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.json");
        model.write_json(&out).unwrap();
        let reread = Model::read_json(&out).unwrap();
        assert_eq!(reread.reactions.len(), model.reactions.len());
        assert_eq!(
            reread.reactions["R3"].gpr.as_ref().unwrap().to_string_id(),
            "(g3 and g4)"
        );
        assert_eq!(reread.objective, model.objective);
        assert_eq!(reread.genes["g1"].annotation, model.genes["g1"].annotation);
    }

    #[test]
    fn unreadable_file() {
        assert!(matches!(
            Model::read_json("/definitely/not/a/model.json"),
            Err(JsonError::UnableToRead(_))
        ));
        assert!(matches!(
            Model::from_json_str("{\"reactions\": 3}"),
            Err(JsonError::UnableToParse(_))
        ));
    }
}
