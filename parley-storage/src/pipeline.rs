//! Aggregation pipelines

use serde_json::Value as JsonValue;

use crate::filter::Filter;

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching the filter
    Match(Filter),
    /// Order by a field
    Sort { field: String, descending: bool },
    /// Skip the first n documents
    Skip(usize),
    /// Keep at most n documents
    Limit(usize),
    /// Keep only the named fields
    Project(Vec<String>),
}

/// An ordered sequence of stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn sort(mut self, field: &str, descending: bool) -> Self {
        self.stages.push(Stage::Sort {
            field: field.to_string(),
            descending,
        });
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.stages.push(Stage::Skip(n));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.stages
            .push(Stage::Project(fields.iter().map(|f| f.to_string()).collect()));
        self
    }

    /// Prepend a stage (used by the gateway for the tenant-scope match)
    pub fn prepend(&mut self, stage: Stage) {
        self.stages.insert(0, stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Every match-stage filter, for scope policing
    pub fn match_filters(&self) -> impl Iterator<Item = &Filter> {
        self.stages.iter().filter_map(|stage| match stage {
            Stage::Match(filter) => Some(filter),
            _ => None,
        })
    }

    /// Run the pipeline over a document set
    pub fn run(&self, mut docs: Vec<JsonValue>) -> Vec<JsonValue> {
        for stage in &self.stages {
            match stage {
                Stage::Match(filter) => docs.retain(|doc| filter.matches(doc)),
                Stage::Sort { field, descending } => {
                    docs.sort_by(|a, b| {
                        let av = a.get(field);
                        let bv = b.get(field);
                        let ord = compare_values(av, bv);
                        if *descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    });
                }
                Stage::Skip(n) => {
                    docs = docs.into_iter().skip(*n).collect();
                }
                Stage::Limit(n) => {
                    docs.truncate(*n);
                }
                Stage::Project(fields) => {
                    for doc in &mut docs {
                        if let Some(obj) = doc.as_object_mut() {
                            obj.retain(|key, _| fields.iter().any(|f| f == key));
                        }
                    }
                }
            }
        }
        docs
    }
}

fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => {
            if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            } else if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
                a.cmp(b)
            } else {
                Ordering::Equal
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
