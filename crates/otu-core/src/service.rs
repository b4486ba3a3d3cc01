//! OTU aggregate service
//!
//! Owns every mutation of an OTU and its isolates and sequences. Each
//! mutation:
//!
//! 1. serializes on the OTU's lock and loads the aggregate
//! 2. checks rights, then validates the request against the loaded state
//! 3. computes the complete new state in memory and re-verifies it
//! 4. commits the OTU write, sequence writes and history record as one batch
//! 5. notifies listeners
//!
//! Nothing is persisted when any step before the commit fails.

use crate::config::ServiceConfig;
use crate::context::{AllowAll, Authorizer, RequestContext, Right};
use crate::describe::Change;
use crate::error::{ConflictField, OtuError, Resource};
use crate::format::{format_otu, IsolateView, OtuView, RecentChange, SequenceView};
use crate::history::{self, Transition};
use crate::input::{IsolatePatch, NewSequence, OtuPatch, SequencePatch};
use crate::locks::OtuLocks;
use crate::notify::{Notification, Notifier, NullNotifier, Verb};
use crate::query::{FindQuery, FindResult, OtuName, OtuPage, OtuSummary};
use crate::verify::verify;
use otu_model::{
    clean_sequence, random_id, unique_id, validate_schema, ChangeId, HistoryRecord, Isolate,
    IsolateId, JoinedOtu, Otu, OtuId, RefId, Reference, Segment, Sequence, SequenceId,
};
use otu_store::{
    HistoryFilter, OtuFilter, OtuStore, OtuWrite, SequenceFilter, SequenceWrite, StoreError,
    WriteBatch,
};
use regex::RegexBuilder;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// OTU document with its sequences, as loaded for one mutation
#[derive(Debug, Clone)]
struct Aggregate {
    otu: Otu,
    sequences: Vec<Sequence>,
}

impl Aggregate {
    fn joined(&self) -> JoinedOtu {
        JoinedOtu::join(&self.otu, &self.sequences)
    }

    fn isolate(&self, id: &IsolateId) -> Result<&Isolate, OtuError> {
        self.otu
            .isolate(id)
            .ok_or_else(|| OtuError::NotFound(Resource::Isolate(id.clone())))
    }

    fn sequence(&self, isolate_id: &IsolateId, id: &SequenceId) -> Result<&Sequence, OtuError> {
        self.sequences
            .iter()
            .find(|sequence| &sequence.id == id && &sequence.isolate_id == isolate_id)
            .ok_or_else(|| OtuError::NotFound(Resource::Sequence(id.clone())))
    }
}

/// Sequence writes turning `old` into `new`
fn sequence_writes(old: &[Sequence], new: &[Sequence]) -> Vec<SequenceWrite> {
    let before: HashMap<&SequenceId, &Sequence> =
        old.iter().map(|sequence| (&sequence.id, sequence)).collect();
    let after: HashSet<&SequenceId> = new.iter().map(|sequence| &sequence.id).collect();

    let mut writes: Vec<SequenceWrite> = old
        .iter()
        .filter(|sequence| !after.contains(&sequence.id))
        .map(|sequence| SequenceWrite::Delete(sequence.id.clone()))
        .collect();

    for sequence in new {
        match before.get(&sequence.id) {
            None => writes.push(SequenceWrite::Insert(sequence.clone())),
            Some(previous) if **previous != *sequence => {
                writes.push(SequenceWrite::Replace(sequence.clone()));
            }
            Some(_) => {}
        }
    }

    writes
}

fn isolate_view(joined: &JoinedOtu, id: &IsolateId) -> Result<IsolateView, OtuError> {
    joined
        .isolates
        .iter()
        .find(|isolate| &isolate.isolate.id == id)
        .map(IsolateView::from)
        .ok_or_else(|| OtuError::NotFound(Resource::Isolate(id.clone())))
}

fn view_with(joined: &JoinedOtu, record: &HistoryRecord) -> OtuView {
    format_otu(joined, Some(RecentChange::from(record)), verify(joined))
}

fn required_text(value: &str, field: &str) -> Result<String, OtuError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OtuError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn required_sequence(raw: &str) -> Result<String, OtuError> {
    let sequence = clean_sequence(raw);
    if sequence.is_empty() {
        return Err(OtuError::InvalidInput("sequence must not be empty".to_string()));
    }
    Ok(sequence)
}

/// Segment to store, or `InvalidSegment` if the schema lacks it
///
/// A missing or empty segment means "no segment".
fn checked_segment(otu: &Otu, segment: Option<&str>) -> Result<Option<String>, OtuError> {
    match segment.map(str::trim) {
        None | Some("") => Ok(None),
        Some(segment) if otu.has_segment(segment) => Ok(Some(segment.to_string())),
        Some(segment) => Err(OtuError::InvalidSegment(segment.to_string())),
    }
}

/// Aggregate service over an [`OtuStore`]
pub struct OtuService {
    store: Arc<dyn OtuStore>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
    locks: OtuLocks,
}

impl fmt::Debug for OtuService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtuService")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl OtuService {
    /// Service granting every right and dropping notifications
    #[must_use]
    pub fn new(store: Arc<dyn OtuStore>) -> Self {
        Self {
            store,
            authorizer: Arc::new(AllowAll),
            notifier: Arc::new(NullNotifier),
            config: ServiceConfig::default(),
            locks: OtuLocks::new(),
        }
    }

    /// With rights checker
    #[inline]
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// With notification sink
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn OtuStore> {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Loading and checks
    // ---------------------------------------------------------------------

    async fn reference(&self, id: &RefId) -> Result<Reference, OtuError> {
        self.store
            .get_reference(id)
            .await?
            .ok_or_else(|| OtuError::NotFound(Resource::Reference(id.clone())))
    }

    async fn load(&self, id: &OtuId) -> Result<Aggregate, OtuError> {
        let otu = self
            .store
            .get_otu(id)
            .await?
            .ok_or_else(|| OtuError::NotFound(Resource::Otu(id.clone())))?;
        let sequences = self.store.find_sequences(&SequenceFilter::for_otu(id.clone())).await?;
        Ok(Aggregate { otu, sequences })
    }

    fn authorize(&self, ctx: &RequestContext, reference: &RefId) -> Result<(), OtuError> {
        if self.authorizer.may(&ctx.user_id, Right::ModifyOtu, reference) {
            Ok(())
        } else {
            debug!(user = %ctx.user_id, %reference, "modify_otu refused");
            Err(OtuError::InsufficientRights)
        }
    }

    async fn load_for_write(&self, ctx: &RequestContext, id: &OtuId) -> Result<Aggregate, OtuError> {
        let aggregate = self.load(id).await?;
        self.authorize(ctx, &aggregate.otu.reference)?;
        Ok(aggregate)
    }

    async fn check_unique(
        &self,
        reference: &RefId,
        name: Option<&str>,
        abbreviation: Option<&str>,
        exclude: Option<&OtuId>,
    ) -> Result<(), OtuError> {
        let mut scope = OtuFilter::new().in_reference(reference.clone());
        if let Some(id) = exclude {
            scope = scope.excluding(id.clone());
        }

        let name_taken = match name {
            Some(name) => self.store.count_otus(&scope.clone().with_name(name)).await? > 0,
            None => false,
        };
        let abbreviation_taken = match abbreviation {
            Some(abbreviation) if !abbreviation.is_empty() => {
                self.store
                    .count_otus(&scope.with_abbreviation(abbreviation))
                    .await?
                    > 0
            }
            _ => false,
        };

        match ConflictField::from_hits(name_taken, abbreviation_taken) {
            Some(field) => Err(OtuError::Conflict(field)),
            None => Ok(()),
        }
    }

    async fn check_source_type(&self, reference: &RefId, source_type: &str) -> Result<String, OtuError> {
        let source_type = source_type.trim().to_lowercase();
        if self.reference(reference).await?.allows_source_type(&source_type) {
            Ok(source_type)
        } else {
            Err(OtuError::InvalidSourceType(source_type))
        }
    }

    async fn new_otu_id(&self) -> Result<OtuId, OtuError> {
        loop {
            let candidate = OtuId::new(random_id(self.config.id_length));
            // History outlives removed OTUs and is keyed by id.
            if self.store.get_otu(&candidate).await?.is_none()
                && self
                    .store
                    .get_history(&ChangeId::for_version(&candidate, 0))
                    .await?
                    .is_none()
            {
                return Ok(candidate);
            }
        }
    }

    fn new_isolate_id(&self, otu: &Otu) -> IsolateId {
        IsolateId::new(unique_id(self.config.id_length, |candidate| {
            otu.isolates.iter().any(|isolate| isolate.id.as_str() == candidate)
        }))
    }

    async fn recent_change(&self, id: &OtuId) -> Result<Option<RecentChange>, OtuError> {
        Ok(self
            .store
            .find_history(&HistoryFilter::for_otu(id.clone()))
            .await?
            .last()
            .map(RecentChange::from))
    }

    async fn current_view(&self, aggregate: &Aggregate) -> Result<OtuView, OtuError> {
        let joined = aggregate.joined();
        let recent = self.recent_change(&aggregate.otu.id).await?;
        let issues = verify(&joined);
        Ok(format_otu(&joined, recent, issues))
    }

    // ---------------------------------------------------------------------
    // Commit pipeline
    // ---------------------------------------------------------------------

    async fn commit(&self, batch: WriteBatch) -> Result<(), OtuError> {
        let otu_id = batch.otu_id().clone();
        self.store.commit(batch).await.map_err(|err| {
            if let StoreError::VersionMismatch { expected, actual, .. } = &err {
                warn!(%otu_id, expected, actual, "lost version race");
            }
            OtuError::from(err)
        })
    }

    async fn commit_update(
        &self,
        ctx: &RequestContext,
        old: &Aggregate,
        mut new: Aggregate,
        change: Change,
    ) -> Result<(JoinedOtu, HistoryRecord), OtuError> {
        new.otu.version = old.otu.version + 1;
        new.otu.verified = verify(&new.joined()).is_none();
        let joined = new.joined();

        let record = history::record(
            &change,
            Transition::Updated {
                old: &old.joined(),
                new: &joined,
            },
            &ctx.user_id,
        )?;

        let writes = sequence_writes(&old.sequences, &new.sequences);
        let batch = WriteBatch::new(
            OtuWrite::Replace {
                otu: new.otu.clone(),
                expected_version: old.otu.version,
            },
            record.clone(),
        )
        .with_sequences(writes);
        self.commit(batch).await?;

        self.notifier
            .notify(Notification::otu(Verb::Update, OtuSummary::from(&new.otu)));
        info!(
            otu_id = %new.otu.id,
            version = new.otu.version,
            method = %record.method_name,
            "committed change"
        );

        Ok((joined, record))
    }

    // ---------------------------------------------------------------------
    // OTU mutations
    // ---------------------------------------------------------------------

    /// Create an OTU with no isolates
    ///
    /// # Errors
    /// `NotFound` for an unknown reference, `InsufficientRights`,
    /// `InvalidInput` for an empty name, `Conflict` on name or abbreviation
    pub async fn create(
        &self,
        ctx: &RequestContext,
        reference: &RefId,
        name: &str,
        abbreviation: &str,
        schema: Vec<Segment>,
    ) -> Result<OtuView, OtuError> {
        let reference = self.reference(reference).await?;
        self.authorize(ctx, &reference.id)?;

        let name = required_text(name, "name")?;
        let abbreviation = abbreviation.trim();
        validate_schema(&schema)?;
        self.check_unique(&reference.id, Some(&name), Some(abbreviation), None)
            .await?;

        let mut otu = Otu::new(self.new_otu_id().await?, reference.id.clone(), name, abbreviation);
        otu.schema = schema;
        otu.verified = verify(&JoinedOtu::join(&otu, &[])).is_none();
        let joined = JoinedOtu::join(&otu, &[]);

        let change = Change::Create {
            name: otu.name.clone(),
            abbreviation: otu.abbreviation.clone(),
        };
        let record = history::record(&change, Transition::Created(&joined), &ctx.user_id)?;
        self.commit(WriteBatch::new(OtuWrite::Insert(otu.clone()), record.clone()))
            .await?;

        self.notifier
            .notify(Notification::otu(Verb::Insert, OtuSummary::from(&otu)));
        info!(otu_id = %otu.id, reference = %otu.reference, "created otu");

        Ok(view_with(&joined, &record))
    }

    /// Edit name, abbreviation or schema
    ///
    /// Fields equal to their current values are ignored; when nothing
    /// differs the current view is returned without a new version.
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`, `InvalidInput`, `Conflict`
    pub async fn edit(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        patch: OtuPatch,
    ) -> Result<OtuView, OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;

        let name = match &patch.name {
            Some(name) => Some(required_text(name, "name")?),
            None => None,
        }
        .filter(|name| name != &old.otu.name);
        let abbreviation = patch
            .abbreviation
            .as_deref()
            .map(|abbreviation| abbreviation.trim().to_string())
            .filter(|abbreviation| abbreviation != &old.otu.abbreviation);
        let schema = patch.schema.filter(|schema| schema != &old.otu.schema);

        if name.is_none() && abbreviation.is_none() && schema.is_none() {
            debug!(%otu_id, "edit changes nothing");
            return self.current_view(&old).await;
        }

        if let Some(schema) = &schema {
            validate_schema(schema)?;
        }
        self.check_unique(
            &old.otu.reference,
            name.as_deref(),
            abbreviation.as_deref(),
            Some(otu_id),
        )
        .await?;

        let mut new = old.clone();
        if let Some(name) = &name {
            new.otu.set_name(name.clone());
        }
        if let Some(abbreviation) = &abbreviation {
            new.otu.abbreviation.clone_from(abbreviation);
        }
        if let Some(schema) = &schema {
            new.otu.schema.clone_from(schema);
            for sequence in &mut new.sequences {
                if sequence
                    .segment
                    .as_deref()
                    .is_some_and(|segment| !schema.iter().any(|declared| declared.name == segment))
                {
                    sequence.segment = None;
                }
            }
        }

        let change = Change::Edit {
            name,
            abbreviation,
            old_abbreviation: old.otu.abbreviation.clone(),
            schema_changed: schema.is_some(),
        };
        let (joined, record) = self.commit_update(ctx, &old, new, change).await?;
        Ok(view_with(&joined, &record))
    }

    /// Remove an OTU and all its sequences
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`
    pub async fn remove(&self, ctx: &RequestContext, otu_id: &OtuId) -> Result<(), OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let joined = old.joined();

        let change = Change::Remove {
            name: old.otu.name.clone(),
            abbreviation: old.otu.abbreviation.clone(),
        };
        let record = history::record(&change, Transition::Removed(&joined), &ctx.user_id)?;
        let version = record.version();

        let batch = WriteBatch::new(
            OtuWrite::Delete {
                id: otu_id.clone(),
                expected_version: old.otu.version,
            },
            record,
        )
        .with_sequences([SequenceWrite::DeleteForOtu(otu_id.clone())]);
        self.commit(batch).await?;

        self.notifier.notify(Notification::removed(otu_id.clone()));
        info!(%otu_id, version, "removed otu");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Isolate mutations
    // ---------------------------------------------------------------------

    /// Add an isolate
    ///
    /// The new isolate is default when it is the first one or when
    /// `default` is requested; any previous default loses the flag.
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`, `InvalidSourceType`
    pub async fn add_isolate(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        source_type: &str,
        source_name: &str,
        default: bool,
    ) -> Result<IsolateView, OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let source_type = self.check_source_type(&old.otu.reference, source_type).await?;

        let mut new = old.clone();
        let id = self.new_isolate_id(&new.otu);
        let default = new.otu.isolates.is_empty() || default;
        if default {
            for isolate in &mut new.otu.isolates {
                isolate.default = false;
            }
        }

        let isolate = Isolate::new(id.clone(), &source_type, source_name.trim(), default);
        let change = Change::AddIsolate {
            isolate_name: new.otu.isolate_name(&isolate),
            default,
        };
        new.otu.isolates.push(isolate);

        let (joined, _) = self.commit_update(ctx, &old, new, change).await?;
        isolate_view(&joined, &id)
    }

    /// Change an isolate's source type or name
    ///
    /// # Errors
    /// `EmptyInput`, `NotFound`, `InsufficientRights`, `InvalidSourceType`
    pub async fn edit_isolate(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
        patch: IsolatePatch,
    ) -> Result<IsolateView, OtuError> {
        if patch.is_empty() {
            return Err(OtuError::EmptyInput);
        }

        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let current = old.isolate(isolate_id)?.clone();

        let source_type = match &patch.source_type {
            Some(source_type) => Some(self.check_source_type(&old.otu.reference, source_type).await?),
            None => None,
        };

        let mut updated = current.clone();
        if let Some(source_type) = source_type {
            updated.source_type = source_type;
        }
        if let Some(source_name) = &patch.source_name {
            source_name.trim().clone_into(&mut updated.source_name);
        }

        let mut new = old.clone();
        if let Some(slot) = new.otu.isolate_mut(isolate_id) {
            *slot = updated.clone();
        }

        let change = Change::EditIsolate {
            old_name: old.otu.isolate_name(&current),
            new_name: new.otu.isolate_name(&updated),
        };
        let (joined, _) = self.commit_update(ctx, &old, new, change).await?;
        isolate_view(&joined, isolate_id)
    }

    /// Make an isolate the default
    ///
    /// Already-default isolates are returned unchanged, without a new version.
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`
    pub async fn set_default_isolate(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
    ) -> Result<IsolateView, OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let isolate = old.isolate(isolate_id)?;

        if isolate.default {
            debug!(%otu_id, %isolate_id, "isolate is already default");
            return isolate_view(&old.joined(), isolate_id);
        }

        let change = Change::SetAsDefault {
            isolate_name: old.otu.isolate_name(isolate),
        };
        let mut new = old.clone();
        for isolate in &mut new.otu.isolates {
            isolate.default = &isolate.id == isolate_id;
        }

        let (joined, _) = self.commit_update(ctx, &old, new, change).await?;
        isolate_view(&joined, isolate_id)
    }

    /// Remove an isolate and its sequences
    ///
    /// Removing the default isolate promotes the first remaining one.
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`
    pub async fn remove_isolate(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
    ) -> Result<(), OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let removed = old.isolate(isolate_id)?.clone();

        let mut new = old.clone();
        new.otu.isolates.retain(|isolate| &isolate.id != isolate_id);
        new.sequences.retain(|sequence| &sequence.isolate_id != isolate_id);

        let mut promoted = None;
        if removed.default {
            if let Some(first) = new.otu.isolates.first_mut() {
                first.default = true;
                promoted = Some(first.clone());
            }
        }

        let change = Change::RemoveIsolate {
            isolate_name: old.otu.isolate_name(&removed),
            promoted: promoted.map(|isolate| new.otu.isolate_name(&isolate)),
        };
        self.commit_update(ctx, &old, new, change).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Sequence mutations
    // ---------------------------------------------------------------------

    /// Add a sequence to an isolate
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`, `InvalidInput`, `InvalidSegment`,
    /// `Conflict` when the accession exists anywhere
    pub async fn create_sequence(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
        input: NewSequence,
    ) -> Result<SequenceView, OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let isolate = old.isolate(isolate_id)?;

        let accession = required_text(&input.accession, "accession")?;
        let definition = required_text(&input.definition, "definition")?;
        let sequence_text = required_sequence(&input.sequence)?;
        let segment = checked_segment(&old.otu, input.segment.as_deref())?;

        let id = SequenceId::new(accession);
        if self.store.get_sequence(&id).await?.is_some() {
            return Err(OtuError::Conflict(ConflictField::Accession));
        }

        let sequence = Sequence {
            id,
            otu_id: otu_id.clone(),
            isolate_id: isolate_id.clone(),
            reference: old.otu.reference.clone(),
            definition,
            host: input.host.trim().to_string(),
            sequence: sequence_text,
            segment,
        };

        let change = Change::CreateSequence {
            accession: sequence.id.to_string(),
            isolate_name: old.otu.isolate_name(isolate),
        };
        let mut new = old.clone();
        new.sequences.push(sequence.clone());

        self.commit_update(ctx, &old, new, change).await?;
        Ok(SequenceView::from(&sequence))
    }

    /// Edit a sequence
    ///
    /// # Errors
    /// `EmptyInput` (checked first), `NotFound` when the OTU, isolate or
    /// sequence is missing or the sequence belongs to another isolate,
    /// `InsufficientRights`, `InvalidInput`, `InvalidSegment`
    pub async fn edit_sequence(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
        sequence_id: &SequenceId,
        patch: SequencePatch,
    ) -> Result<SequenceView, OtuError> {
        if patch.is_empty() {
            return Err(OtuError::EmptyInput);
        }

        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let isolate = old.isolate(isolate_id)?;
        let mut updated = old.sequence(isolate_id, sequence_id)?.clone();

        if let Some(segment) = &patch.segment {
            updated.segment = checked_segment(&old.otu, Some(segment))?;
        }
        if let Some(definition) = &patch.definition {
            updated.definition = required_text(definition, "definition")?;
        }
        if let Some(host) = &patch.host {
            host.trim().clone_into(&mut updated.host);
        }
        if let Some(sequence) = &patch.sequence {
            updated.sequence = required_sequence(sequence)?;
        }

        let change = Change::EditSequence {
            accession: sequence_id.to_string(),
            isolate_name: old.otu.isolate_name(isolate),
        };
        let mut new = old.clone();
        if let Some(slot) = new.sequences.iter_mut().find(|sequence| &sequence.id == sequence_id) {
            *slot = updated.clone();
        }

        self.commit_update(ctx, &old, new, change).await?;
        Ok(SequenceView::from(&updated))
    }

    /// Remove a sequence
    ///
    /// # Errors
    /// `NotFound`, `InsufficientRights`
    pub async fn remove_sequence(
        &self,
        ctx: &RequestContext,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
        sequence_id: &SequenceId,
    ) -> Result<(), OtuError> {
        let _guard = self.locks.acquire(otu_id).await;
        let old = self.load_for_write(ctx, otu_id).await?;
        let isolate = old.isolate(isolate_id)?;
        old.sequence(isolate_id, sequence_id)?;

        let change = Change::RemoveSequence {
            accession: sequence_id.to_string(),
            isolate_name: old.otu.isolate_name(isolate),
        };
        let mut new = old.clone();
        new.sequences.retain(|sequence| &sequence.id != sequence_id);

        self.commit_update(ctx, &old, new, change).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Joined and formatted OTU with its most recent change
    ///
    /// # Errors
    /// `NotFound`
    pub async fn get(&self, otu_id: &OtuId) -> Result<OtuView, OtuError> {
        let aggregate = self.load(otu_id).await?;
        self.current_view(&aggregate).await
    }

    /// Search OTUs by name or abbreviation
    ///
    /// # Errors
    /// Store failures only
    pub async fn find(&self, query: &FindQuery) -> Result<FindResult, OtuError> {
        let mut scope = OtuFilter::new();
        if let Some(reference) = &query.reference {
            scope = scope.in_reference(reference.clone());
        }

        let mut filter = scope.clone();
        if let Some(term) = query.term.as_deref().map(str::trim).filter(|term| !term.is_empty()) {
            let pattern = RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build()
                .map_err(|err| OtuError::InvalidInput(err.to_string()))?;
            filter = filter.with_pattern(pattern);
        }
        if let Some(verified) = query.verified {
            filter = filter.with_verified(verified);
        }

        let mut otus = self.store.find_otus(&filter).await?;
        otus.sort_by(|a, b| a.lower_name.cmp(&b.lower_name));

        if query.names {
            return Ok(FindResult::Names(otus.iter().map(OtuName::from).collect()));
        }

        let total_count = self.store.count_otus(&scope).await?;
        let per_page = query
            .per_page
            .unwrap_or(self.config.default_per_page)
            .clamp(1, self.config.max_per_page);
        let page = query.page.max(1);
        let found_count = otus.len();

        Ok(FindResult::Page(OtuPage {
            documents: otus
                .iter()
                .skip((page - 1).saturating_mul(per_page))
                .take(per_page)
                .map(OtuSummary::from)
                .collect(),
            found_count,
            total_count,
            page,
            per_page,
            page_count: found_count.div_ceil(per_page),
        }))
    }

    /// Isolates of an OTU with their sequences
    ///
    /// # Errors
    /// `NotFound`
    pub async fn list_isolates(&self, otu_id: &OtuId) -> Result<Vec<IsolateView>, OtuError> {
        let joined = self.load(otu_id).await?.joined();
        Ok(joined.isolates.iter().map(IsolateView::from).collect())
    }

    /// One isolate with its sequences
    ///
    /// # Errors
    /// `NotFound`
    pub async fn get_isolate(
        &self,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
    ) -> Result<IsolateView, OtuError> {
        isolate_view(&self.load(otu_id).await?.joined(), isolate_id)
    }

    /// Sequences of one isolate
    ///
    /// # Errors
    /// `NotFound`
    pub async fn list_sequences(
        &self,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
    ) -> Result<Vec<SequenceView>, OtuError> {
        Ok(self.get_isolate(otu_id, isolate_id).await?.sequences)
    }

    /// One sequence of an isolate
    ///
    /// # Errors
    /// `NotFound`, including when the sequence belongs to another isolate
    pub async fn get_sequence(
        &self,
        otu_id: &OtuId,
        isolate_id: &IsolateId,
        sequence_id: &SequenceId,
    ) -> Result<SequenceView, OtuError> {
        let aggregate = self.load(otu_id).await?;
        aggregate.isolate(isolate_id)?;
        Ok(SequenceView::from(aggregate.sequence(isolate_id, sequence_id)?))
    }

    /// History of an OTU, ascending by version
    ///
    /// Records outlive the OTU, so removed OTUs still have history.
    ///
    /// # Errors
    /// Store failures only
    pub async fn list_history(&self, otu_id: &OtuId) -> Result<Vec<HistoryRecord>, OtuError> {
        Ok(self
            .store
            .find_history(&HistoryFilter::for_otu(otu_id.clone()))
            .await?)
    }

    /// One history record
    ///
    /// # Errors
    /// `NotFound`
    pub async fn get_history(&self, change_id: &ChangeId) -> Result<HistoryRecord, OtuError> {
        self.store
            .get_history(change_id)
            .await?
            .ok_or_else(|| OtuError::NotFound(Resource::History(change_id.clone())))
    }
}
