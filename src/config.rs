use crate::engine::EngineOptions;
use crate::matcher::WindowSpan;
use crate::normalize::FieldHints;
use crate::transcript::AcceptancePolicy;
use crate::{ExtractArgs, HintArgs, NormalizeArgs, PolicyArgs, ProbeArgs, SearchArgs};
use std::path::PathBuf;

/// Configuration for running an engine over one image
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub image: PathBuf,
    pub engine: Option<String>,
    pub options: EngineOptions,
    pub hints: FieldHints,
    pub policy: AcceptancePolicy,
    pub output: PathBuf,
    pub min_chars: usize,
}

/// Configuration for normalizing a saved result dump
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    pub input: PathBuf,
    pub page: Option<usize>,
    pub hints: FieldHints,
    pub policy: AcceptancePolicy,
    pub output: Option<PathBuf>,
    pub min_chars: usize,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub input: PathBuf,
    pub page: Option<usize>,
    pub preview: usize,
    pub attribute_container: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub blocks: PathBuf,
    pub keywords: Vec<String>,
    pub keywords_file: Option<PathBuf>,
    pub anchor: String,
    pub span: WindowSpan,
}

impl From<HintArgs> for FieldHints {
    fn from(args: HintArgs) -> Self {
        let defaults = FieldHints::default();
        Self {
            text_fields: non_empty_or(args.text_fields, defaults.text_fields),
            score_fields: non_empty_or(args.score_fields, defaults.score_fields),
            polygon_field: args.polygon_field.or(defaults.polygon_field),
            attribute_container: args
                .attribute_container
                .unwrap_or(defaults.attribute_container),
        }
    }
}

impl From<PolicyArgs> for AcceptancePolicy {
    fn from(args: PolicyArgs) -> Self {
        let defaults = AcceptancePolicy::default();
        Self {
            min_text_len: args.min_text_len.unwrap_or(defaults.min_text_len),
            min_confidence: args.min_confidence.unwrap_or(defaults.min_confidence),
        }
    }
}

impl From<ExtractArgs> for ExtractConfig {
    fn from(args: ExtractArgs) -> Self {
        let defaults = EngineOptions::default();
        Self {
            image: args.image,
            engine: args.engine,
            options: EngineOptions {
                use_angle_cls: args.use_angle_cls,
                lang: args.lang,
                det_db_thresh: args.det_db_thresh.unwrap_or(defaults.det_db_thresh),
                det_db_box_thresh: args
                    .det_db_box_thresh
                    .unwrap_or(defaults.det_db_box_thresh),
            },
            hints: FieldHints::default(),
            policy: args.policy.into(),
            output: args.output,
            min_chars: args.min_chars,
        }
    }
}

impl From<NormalizeArgs> for NormalizeConfig {
    fn from(args: NormalizeArgs) -> Self {
        Self {
            input: args.input,
            page: args.page,
            hints: args.hints.into(),
            policy: args.policy.into(),
            output: args.output,
            min_chars: args.min_chars,
        }
    }
}

impl From<ProbeArgs> for ProbeConfig {
    fn from(args: ProbeArgs) -> Self {
        Self {
            input: args.input,
            page: args.page,
            preview: args.preview,
            attribute_container: args.attribute_container,
        }
    }
}

impl From<SearchArgs> for SearchConfig {
    fn from(args: SearchArgs) -> Self {
        Self {
            blocks: args.blocks,
            keywords: args.keywords,
            keywords_file: args.keywords_file,
            anchor: args.anchor,
            span: WindowSpan {
                before: args.before,
                after: args.after,
            },
        }
    }
}

fn non_empty_or(values: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if values.is_empty() {
        fallback
    } else {
        values
    }
}
