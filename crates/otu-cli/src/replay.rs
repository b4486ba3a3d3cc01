//! Run a [`Script`] against an in-memory store

use crate::script::{Labels, Script, Step};
use otu_core::{
    IsolatePatch, NewSequence, OtuError, OtuPatch, OtuService, OtuView, RequestContext,
    SequencePatch, ServiceConfig,
};
use otu_model::{HistoryRecord, IsolateId, OtuId, RefId, SequenceId};
use otu_store::MemoryStore;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// 1-based position in the script
    pub index: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status the error maps to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl StepOutcome {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    /// Surviving OTUs in creation order
    pub otus: Vec<OtuView>,
    /// History of every OTU the script created, removed ones included
    pub history: Vec<HistoryRecord>,
}

impl ReplayReport {
    /// Steps that returned an error
    #[must_use]
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.is_ok()).count()
    }

    /// Plain-text rendering for terminals
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for step in &self.steps {
            match (&step.error, step.status) {
                (Some(error), Some(status)) => {
                    let _ = writeln!(out, "step {} {}: error {status} {error}", step.index, step.op);
                }
                _ => {
                    let _ = writeln!(out, "step {} {}: ok", step.index, step.op);
                }
            }
        }

        for otu in &self.otus {
            let state = if otu.verified { "verified" } else { "unverified" };
            let _ = writeln!(out);
            if otu.abbreviation.is_empty() {
                let _ = writeln!(out, "otu {} {} v{} {state}", otu.id, otu.name, otu.version);
            } else {
                let _ = writeln!(
                    out,
                    "otu {} {} ({}) v{} {state}",
                    otu.id, otu.name, otu.abbreviation, otu.version
                );
            }
            for isolate in &otu.isolates {
                let marker = if isolate.default { "*" } else { " " };
                let _ = writeln!(
                    out,
                    "  {marker} {} {} {} ({} sequences)",
                    isolate.id,
                    isolate.source_type,
                    isolate.source_name,
                    isolate.sequences.len()
                );
            }
        }

        if !self.history.is_empty() {
            let _ = writeln!(out);
        }
        for record in &self.history {
            let _ = writeln!(out, "{} {}: {}", record.id, record.method_name, record.description);
        }

        out
    }
}

/// Apply one step; returns the id created by the step, if any
async fn execute(
    service: &OtuService,
    ctx: &RequestContext,
    labels: &Labels,
    step: &Step,
) -> Result<Option<String>, OtuError> {
    let otu_id = |raw: &str| OtuId::new(labels.resolve(raw));
    let isolate_id = |raw: &str| IsolateId::new(labels.resolve(raw));

    match step {
        Step::Create {
            reference,
            name,
            abbreviation,
            schema,
            ..
        } => {
            let view = service
                .create(ctx, &RefId::new(reference.as_str()), name, abbreviation, schema.clone())
                .await?;
            Ok(Some(view.id.to_string()))
        }
        Step::Edit {
            otu,
            name,
            abbreviation,
            schema,
        } => {
            let patch = OtuPatch {
                name: name.clone(),
                abbreviation: abbreviation.clone(),
                schema: schema.clone(),
            };
            service.edit(ctx, &otu_id(otu), patch).await?;
            Ok(None)
        }
        Step::Remove { otu } => {
            service.remove(ctx, &otu_id(otu)).await?;
            Ok(None)
        }
        Step::AddIsolate {
            otu,
            source_type,
            source_name,
            default,
            ..
        } => {
            let view = service
                .add_isolate(ctx, &otu_id(otu), source_type, source_name, *default)
                .await?;
            Ok(Some(view.id.to_string()))
        }
        Step::EditIsolate {
            otu,
            isolate,
            source_type,
            source_name,
        } => {
            let patch = IsolatePatch {
                source_type: source_type.clone(),
                source_name: source_name.clone(),
            };
            service
                .edit_isolate(ctx, &otu_id(otu), &isolate_id(isolate), patch)
                .await?;
            Ok(None)
        }
        Step::SetDefaultIsolate { otu, isolate } => {
            service
                .set_default_isolate(ctx, &otu_id(otu), &isolate_id(isolate))
                .await?;
            Ok(None)
        }
        Step::RemoveIsolate { otu, isolate } => {
            service
                .remove_isolate(ctx, &otu_id(otu), &isolate_id(isolate))
                .await?;
            Ok(None)
        }
        Step::CreateSequence {
            otu,
            isolate,
            accession,
            definition,
            host,
            sequence,
            segment,
        } => {
            let mut input = NewSequence::new(accession.as_str(), definition.as_str(), sequence.as_str())
                .with_host(host.as_str());
            input.segment.clone_from(segment);
            let view = service
                .create_sequence(ctx, &otu_id(otu), &isolate_id(isolate), input)
                .await?;
            Ok(Some(view.id.to_string()))
        }
        Step::EditSequence {
            otu,
            isolate,
            accession,
            definition,
            host,
            sequence,
            segment,
        } => {
            let patch = SequencePatch {
                definition: definition.clone(),
                host: host.clone(),
                sequence: sequence.clone(),
                segment: segment.clone(),
            };
            service
                .edit_sequence(
                    ctx,
                    &otu_id(otu),
                    &isolate_id(isolate),
                    &SequenceId::new(accession.as_str()),
                    patch,
                )
                .await?;
            Ok(None)
        }
        Step::RemoveSequence {
            otu,
            isolate,
            accession,
        } => {
            service
                .remove_sequence(
                    ctx,
                    &otu_id(otu),
                    &isolate_id(isolate),
                    &SequenceId::new(accession.as_str()),
                )
                .await?;
            Ok(None)
        }
    }
}

/// Replay `script` on a fresh [`MemoryStore`]
///
/// Failing steps are recorded and the replay continues.
///
/// # Errors
/// Store failures while collecting the final state
pub async fn run_replay(script: &Script, config: ServiceConfig) -> Result<ReplayReport, OtuError> {
    let store = Arc::new(MemoryStore::with_references(script.references.iter().cloned()));
    let service = OtuService::new(store).with_config(config);
    let ctx = RequestContext::new(script.user.as_str());

    let mut labels = Labels::default();
    let mut created: Vec<OtuId> = Vec::new();
    let mut steps = Vec::with_capacity(script.steps.len());

    for (position, step) in script.steps.iter().enumerate() {
        let index = position + 1;
        match execute(&service, &ctx, &labels, step).await {
            Ok(id) => {
                if let (Some(label), Some(id)) = (step.label(), &id) {
                    labels.bind(label, id.as_str());
                }
                if let (Step::Create { .. }, Some(id)) = (step, id) {
                    created.push(OtuId::new(id));
                }
                steps.push(StepOutcome {
                    index,
                    op: step.op(),
                    error: None,
                    status: None,
                });
            }
            Err(err) => {
                warn!(index, op = step.op(), error = %err, "step failed");
                steps.push(StepOutcome {
                    index,
                    op: step.op(),
                    error: Some(err.to_string()),
                    status: Some(err.http_status()),
                });
            }
        }
    }

    let mut otus = Vec::new();
    let mut history = Vec::new();
    for id in &created {
        match service.get(id).await {
            Ok(view) => otus.push(view),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        history.extend(service.list_history(id).await?);
    }

    let report = ReplayReport {
        steps,
        otus,
        history,
    };
    info!(
        steps = report.steps.len(),
        failures = report.failures(),
        otus = report.otus.len(),
        "replay finished"
    );
    Ok(report)
}
