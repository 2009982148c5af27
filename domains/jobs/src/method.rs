//! Method registry: the fixed set of phylogenetic analyses the core can
//! submit. Methods differ only in parameter surface and result schema;
//! command synthesis and the `GET /methods` descriptor surface are both
//! driven off this one registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use phylo_common::Error;

/// One of the fixed analysis methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "method_type", rename_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum MethodType {
    Fel,
    Slac,
    Busted,
    Meme,
    Fubar,
    Absrel,
    Relax,
    Gard,
    Bgm,
    MultiHit,
    Nrm,
    Fade,
    ContrastFel,
    SlatkinMaddison,
}

impl MethodType {
    pub fn all() -> &'static [MethodType] {
        use MethodType::*;
        &[
            Fel, Slac, Busted, Meme, Fubar, Absrel, Relax, Gard, Bgm, MultiHit, Nrm, Fade,
            ContrastFel, SlatkinMaddison,
        ]
    }

    pub fn parse(raw: &str) -> Option<Self> {
        use MethodType::*;
        match raw.to_ascii_lowercase().replace('_', "-").as_str() {
            "fel" => Some(Fel),
            "slac" => Some(Slac),
            "busted" => Some(Busted),
            "meme" => Some(Meme),
            "fubar" => Some(Fubar),
            "absrel" => Some(Absrel),
            "relax" => Some(Relax),
            "gard" => Some(Gard),
            "bgm" => Some(Bgm),
            "multi-hit" => Some(MultiHit),
            "nrm" => Some(Nrm),
            "fade" => Some(Fade),
            "contrast-fel" => Some(ContrastFel),
            "slatkin-maddison" => Some(SlatkinMaddison),
            _ => None,
        }
    }

    /// The binary subcommand token used when synthesizing the shell command.
    pub fn command_token(&self) -> &'static str {
        use MethodType::*;
        match self {
            Fel => "fel",
            Slac => "slac",
            Busted => "busted",
            Meme => "meme",
            Fubar => "fubar",
            Absrel => "absrel",
            Relax => "relax",
            Gard => "gard",
            Bgm => "bgm",
            MultiHit => "multi-hit",
            Nrm => "nrm",
            Fade => "fade",
            ContrastFel => "contrast-fel",
            SlatkinMaddison => "slatkin-maddison",
        }
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        use MethodType::*;
        let (name, description) = match self {
            Fel => ("FEL", "Fixed Effects Likelihood, site-level selection"),
            Slac => ("SLAC", "Single-Likelihood Ancestor Counting"),
            Busted => ("BUSTED", "Branch-site Unrestricted Statistical Test for Episodic Diversification"),
            Meme => ("MEME", "Mixed Effects Model of Evolution"),
            Fubar => ("FUBAR", "Fast, Unconstrained Bayesian AppRoximation"),
            Absrel => ("aBSREL", "adaptive Branch-Site Random Effects Likelihood"),
            Relax => ("RELAX", "test for relaxed/intensified selection"),
            Gard => ("GARD", "Genetic Algorithm for Recombination Detection"),
            Bgm => ("BGM", "Bayesian Graphical Model of co-evolving sites"),
            MultiHit => ("MULTI-HIT", "test for multi-nucleotide substitutions"),
            Nrm => ("NRM", "Nucleotide Rate Matrix estimation"),
            Fade => ("FADE", "FUBAR Approach to Directional Evolution"),
            ContrastFel => ("CONTRAST-FEL", "contrast selection between clades"),
            SlatkinMaddison => ("Slatkin-Maddison", "test for population subdivision"),
        };
        MethodDescriptor {
            tag: self.command_token(),
            name,
            description,
            endpoint: format!("/methods/{}", self.command_token()),
        }
    }
}

impl std::fmt::Display for MethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_token())
    }
}

/// Human-facing metadata for a method, as surfaced by `GET /methods`.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDescriptor {
    pub tag: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub endpoint: String,
}

/// Parameters for a method invocation, keyed by flag name. Values are
/// normalized to a canonical string form before entering the command so
/// that ID derivation is stable across equivalent JSON encodings (e.g.
/// `true` vs `"true"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodParams(pub BTreeMap<String, Value>);

impl MethodParams {
    /// Render as a canonical, sorted `--flag=value` token sequence.
    /// `BTreeMap` iteration is already key-sorted, which is what makes
    /// this deterministic regardless of submission order.
    pub fn to_command_tokens(&self) -> Result<Vec<String>, Error> {
        let mut tokens = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            if key.trim().is_empty() {
                return Err(Error::Validation("parameter name must not be empty".to_string()));
            }
            let rendered = match value {
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                Value::Null => "null".to_string(),
                other => {
                    return Err(Error::Validation(format!(
                        "parameter '{key}' has unsupported type: {other}"
                    )))
                }
            };
            tokens.push(format!("--{key}={rendered}"));
        }
        Ok(tokens)
    }
}

/// Build the normalized, fully-qualified command string for a submission.
/// Deterministic in method, dataset ids, and parameter content —
/// independent of submission order or JSON key order.
pub fn normalize_command(
    method: MethodType,
    alignment_id: &str,
    tree_id: Option<&str>,
    params: &MethodParams,
) -> Result<String, Error> {
    let mut parts = vec![
        "hyphy".to_string(),
        method.command_token().to_string(),
        format!("--alignment={alignment_id}"),
    ];
    if let Some(tree_id) = tree_id {
        parts.push(format!("--tree={tree_id}"));
    }
    parts.extend(params.to_command_tokens()?);
    Ok(parts.join(" "))
}
