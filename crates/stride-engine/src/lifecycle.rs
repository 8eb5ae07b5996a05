use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use stride_types::api::{
    CreateChallengeRequest, DisciplineInput, HabitDraftPayload, ModifyDisciplineInput,
    RespondAction, RespondRequest,
};
use stride_types::models::{
    Challenge, ChallengeKind, ChallengeStatus, Discipline, FinishConsent, Habit, HabitDraft,
    HabitKind, HabitSource, ParticipantRole,
};

use crate::draft::normalize_draft;
use crate::error::{EngineError, EngineResult};
use crate::store::ChallengeStore;

/// The challenge engine: lifecycle transitions on one side, scoring and
/// aggregation (see [`crate::summary`]) on the other. All methods take the
/// captured `now` of the request so one call never observes two different
/// day boundaries.
pub struct ChallengeEngine<S: ChallengeStore> {
    store: S,
}

/// A discipline side after habit resolution: either a fetched habit or a
/// normalized draft awaiting materialization.
enum ResolvedSide {
    Existing(Habit),
    Draft(HabitDraft),
}

impl ResolvedSide {
    fn kind(&self) -> HabitKind {
        match self {
            ResolvedSide::Existing(h) => h.kind,
            ResolvedSide::Draft(d) => d.kind,
        }
    }

    fn unit(&self) -> &str {
        match self {
            ResolvedSide::Existing(h) => &h.unit,
            ResolvedSide::Draft(d) => &d.unit,
        }
    }
}

/// A fully validated discipline, ready to be materialized and committed.
struct DisciplinePlan {
    owner: ResolvedSide,
    challenger: Option<ResolvedSide>,
    daily_goal: f64,
}

fn resolve_source(
    id: Option<Uuid>,
    draft: Option<&HabitDraftPayload>,
    side: &str,
) -> EngineResult<HabitSource> {
    match (id, draft) {
        (Some(_), Some(_)) => Err(EngineError::validation(format!(
            "discipline supplies both an existing {side} habit and a draft"
        ))),
        (Some(id), None) => Ok(HabitSource::Existing(id)),
        (None, Some(d)) => Ok(HabitSource::Draft(normalize_draft(d)?)),
        (None, None) => Err(EngineError::validation(format!(
            "discipline requires a {side} habit"
        ))),
    }
}

fn resolve_daily_goal(owner_kind: HabitKind, requested: Option<f64>) -> EngineResult<f64> {
    // Check habits are done-or-not: the goal is always 1.
    if owner_kind.is_check() {
        return Ok(1.0);
    }
    match requested {
        Some(g) if g.is_finite() && g > 0.0 => Ok(g),
        _ => Err(EngineError::validation("daily goal must be a positive number")),
    }
}

impl<S: ChallengeStore> ChallengeEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -- Create --

    pub fn create_challenge(
        &self,
        owner_id: Uuid,
        input: CreateChallengeRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Challenge> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(EngineError::validation("challenge requires a title"));
        }

        let opponent_id = match input.kind {
            ChallengeKind::Personal => {
                if input.opponent_id.is_some() {
                    return Err(EngineError::validation(
                        "personal challenges take no opponent",
                    ));
                }
                None
            }
            ChallengeKind::Friend => Some(input.opponent_id.ok_or_else(|| {
                EngineError::validation("friend challenges require an opponent")
            })?),
        };

        let start_date = input.start_date.unwrap_or(now);
        if let Some(end) = input.end_date {
            if end < start_date {
                return Err(EngineError::validation(
                    "challenge end date precedes its start",
                ));
            }
        }

        if input.disciplines.is_empty() {
            return Err(EngineError::validation(
                "challenge requires at least one discipline",
            ));
        }

        // Resolve and validate everything before any write happens; a single
        // invalid discipline aborts the whole call.
        let mut plans = Vec::with_capacity(input.disciplines.len());
        for d in &input.disciplines {
            plans.push(self.plan_discipline(owner_id, opponent_id, input.kind, d)?);
        }

        // Owner-side drafts are materialized before the aggregate commit so
        // disciplines never reference habits that do not exist.
        let mut disciplines = Vec::with_capacity(plans.len());
        for plan in plans {
            let owner_habit = match plan.owner {
                ResolvedSide::Existing(h) => h,
                ResolvedSide::Draft(d) => self.store.create_habit(owner_id, &d)?,
            };
            let (challenger_habit_id, pending) = match plan.challenger {
                Some(ResolvedSide::Existing(h)) => (Some(h.id), None),
                Some(ResolvedSide::Draft(d)) => (None, Some(d)),
                None => (None, None),
            };
            disciplines.push(Discipline {
                id: Uuid::new_v4(),
                owner_id,
                challenger_id: opponent_id,
                owner_habit_id: owner_habit.id,
                challenger_habit_id,
                pending_challenger_habit: pending,
                daily_goal: plan.daily_goal,
                kind: input.kind,
            });
        }

        let (status, awaiting_user_id) = match input.kind {
            ChallengeKind::Personal => (ChallengeStatus::Active, None),
            ChallengeKind::Friend => (ChallengeStatus::Pending, opponent_id),
        };

        let challenge = Challenge {
            id: Uuid::new_v4(),
            title,
            kind: input.kind,
            status,
            owner_id,
            opponent_id,
            initiator_id: owner_id,
            awaiting_user_id,
            start_date,
            end_date: input.end_date,
            finish_consent: FinishConsent::default(),
            disciplines,
            created_at: now,
        };
        self.store.insert_challenge(&challenge)?;

        info!(
            challenge = %challenge.id,
            kind = challenge.kind.as_str(),
            disciplines = challenge.disciplines.len(),
            "challenge created"
        );
        Ok(challenge)
    }

    fn plan_discipline(
        &self,
        owner_id: Uuid,
        opponent_id: Option<Uuid>,
        kind: ChallengeKind,
        input: &DisciplineInput,
    ) -> EngineResult<DisciplinePlan> {
        let owner_source =
            resolve_source(input.owner_habit_id, input.owner_habit_draft.as_ref(), "owner")?;
        let owner = self.resolve_side(owner_source, owner_id)?;

        let challenger = match kind {
            ChallengeKind::Personal => {
                if input.challenger_habit_id.is_some() || input.challenger_habit_draft.is_some() {
                    return Err(EngineError::validation(
                        "personal challenges take no challenger habit",
                    ));
                }
                None
            }
            ChallengeKind::Friend => {
                let Some(opponent_id) = opponent_id else {
                    return Err(EngineError::validation(
                        "friend challenges require an opponent",
                    ));
                };
                let source = resolve_source(
                    input.challenger_habit_id,
                    input.challenger_habit_draft.as_ref(),
                    "challenger",
                )?;
                Some(self.resolve_side(source, opponent_id)?)
            }
        };

        if let Some(ch) = &challenger {
            if ch.kind() != owner.kind() || ch.unit() != owner.unit() {
                return Err(EngineError::validation(
                    "paired habits must share kind and unit",
                ));
            }
        }

        let daily_goal = resolve_daily_goal(owner.kind(), input.daily_goal)?;

        Ok(DisciplinePlan {
            owner,
            challenger,
            daily_goal,
        })
    }

    fn resolve_side(&self, source: HabitSource, user_id: Uuid) -> EngineResult<ResolvedSide> {
        match source {
            HabitSource::Existing(id) => {
                let habit = self
                    .store
                    .find_habit(id, user_id)?
                    .ok_or(EngineError::NotFound("habit"))?;
                Ok(ResolvedSide::Existing(habit))
            }
            HabitSource::Draft(draft) => Ok(ResolvedSide::Draft(draft)),
        }
    }

    // -- Respond --

    pub fn respond_to_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        input: RespondRequest,
    ) -> EngineResult<Challenge> {
        let mut challenge = self.load(challenge_id)?;
        if challenge.status != ChallengeStatus::Pending {
            return Err(EngineError::conflict("challenge is not awaiting a response"));
        }
        if challenge.awaiting_user_id != Some(user_id) {
            return Err(EngineError::Forbidden(
                "only the awaited participant may respond",
            ));
        }

        match input.action {
            RespondAction::Accept => {
                // Materialize the opponent's pending habits, then activate.
                for d in &mut challenge.disciplines {
                    if let Some(draft) = d.pending_challenger_habit.take() {
                        let habit = self.store.create_habit(user_id, &draft)?;
                        d.challenger_habit_id = Some(habit.id);
                    }
                }
                challenge.status = ChallengeStatus::Active;
                challenge.awaiting_user_id = None;
            }
            RespondAction::Reject => {
                challenge.status = ChallengeStatus::Rejected;
                challenge.awaiting_user_id = None;
            }
            RespondAction::Modify => {
                self.apply_counter_offer(&mut challenge, user_id, &input)?;
            }
        }

        self.store.update_challenge(&challenge)?;
        info!(
            challenge = %challenge.id,
            status = challenge.status.as_str(),
            "challenge response applied"
        );
        Ok(challenge)
    }

    /// Replace the discipline set with the responder's counter-offer and hand
    /// the decision back to the other party. Only fully-resolved habit ids
    /// are accepted here; drafts belong to the create step.
    fn apply_counter_offer(
        &self,
        challenge: &mut Challenge,
        user_id: Uuid,
        input: &RespondRequest,
    ) -> EngineResult<()> {
        let Some(opponent_id) = challenge.opponent_id else {
            return Err(EngineError::conflict(
                "challenge has no opponent to negotiate with",
            ));
        };
        let inputs: &[ModifyDisciplineInput] = input.disciplines.as_deref().unwrap_or(&[]);
        if inputs.is_empty() {
            return Err(EngineError::validation(
                "counter-offer requires at least one discipline",
            ));
        }

        let mut disciplines = Vec::with_capacity(inputs.len());
        for di in inputs {
            let owner_habit = self
                .store
                .find_habit(di.owner_habit_id, challenge.owner_id)?
                .ok_or(EngineError::NotFound("habit"))?;
            let challenger_habit = self
                .store
                .find_habit(di.challenger_habit_id, opponent_id)?
                .ok_or(EngineError::NotFound("habit"))?;
            if owner_habit.kind != challenger_habit.kind || owner_habit.unit != challenger_habit.unit
            {
                return Err(EngineError::validation(
                    "paired habits must share kind and unit",
                ));
            }
            let daily_goal = resolve_daily_goal(owner_habit.kind, di.daily_goal)?;
            disciplines.push(Discipline {
                id: Uuid::new_v4(),
                owner_id: challenge.owner_id,
                challenger_id: Some(opponent_id),
                owner_habit_id: owner_habit.id,
                challenger_habit_id: Some(challenger_habit.id),
                pending_challenger_habit: None,
                daily_goal,
                kind: challenge.kind,
            });
        }

        if let Some(start) = input.start_date {
            challenge.start_date = start;
        }
        if let Some(end) = input.end_date {
            challenge.end_date = Some(end);
        }
        if let Some(end) = challenge.end_date {
            if end < challenge.start_date {
                return Err(EngineError::validation(
                    "challenge end date precedes its start",
                ));
            }
        }

        challenge.disciplines = disciplines;
        challenge.initiator_id = user_id;
        challenge.awaiting_user_id = Some(if user_id == challenge.owner_id {
            opponent_id
        } else {
            challenge.owner_id
        });
        Ok(())
    }

    // -- Finish protocol --

    pub fn request_finish(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> EngineResult<Challenge> {
        let mut challenge = self.load(challenge_id)?;
        let role = challenge
            .role_of(user_id)
            .ok_or(EngineError::Forbidden("not a participant"))?;
        if !matches!(
            challenge.status,
            ChallengeStatus::Active | ChallengeStatus::PendingFinish
        ) {
            return Err(EngineError::conflict(
                "challenge cannot be finished from its current status",
            ));
        }

        challenge.finish_consent = challenge.finish_consent.request(role);
        let consent_complete = challenge.finish_consent.is_complete()
            || challenge.kind == ChallengeKind::Personal;

        if consent_complete {
            challenge.status = ChallengeStatus::Finished;
            // An unset or future end date is clamped to the finish moment.
            if challenge.end_date.is_none_or(|end| end > now) {
                challenge.end_date = Some(now);
            }
        } else {
            challenge.status = ChallengeStatus::PendingFinish;
        }

        self.store.update_challenge(&challenge)?;
        info!(
            challenge = %challenge.id,
            status = challenge.status.as_str(),
            "finish requested"
        );
        Ok(challenge)
    }

    pub fn decline_finish(&self, challenge_id: Uuid, user_id: Uuid) -> EngineResult<Challenge> {
        let mut challenge = self.load(challenge_id)?;
        let role = challenge
            .role_of(user_id)
            .ok_or(EngineError::Forbidden("not a participant"))?;
        if challenge.status != ChallengeStatus::PendingFinish {
            return Err(EngineError::conflict("no finish request is pending"));
        }
        if challenge.finish_consent.requested_by(role) {
            return Err(EngineError::Forbidden(
                "the requesting side cannot decline its own finish request",
            ));
        }
        let other = match role {
            ParticipantRole::Owner => ParticipantRole::Opponent,
            ParticipantRole::Opponent => ParticipantRole::Owner,
        };
        if !challenge.finish_consent.requested_by(other) {
            return Err(EngineError::conflict("no finish request to decline"));
        }

        challenge.finish_consent = FinishConsent::NoOneRequested;
        challenge.status = ChallengeStatus::Active;
        self.store.update_challenge(&challenge)?;
        info!(challenge = %challenge.id, "finish request declined");
        Ok(challenge)
    }

    // -- Delete / list --

    /// Unconditional removal, allowed to either participant at any status.
    /// Disciplines go with the challenge.
    pub fn delete_challenge(&self, challenge_id: Uuid, user_id: Uuid) -> EngineResult<()> {
        let challenge = self.load(challenge_id)?;
        if !challenge.is_participant(user_id) {
            return Err(EngineError::Forbidden("not a participant"));
        }
        self.store.delete_challenge(challenge.id)?;
        info!(challenge = %challenge.id, "challenge deleted");
        Ok(())
    }

    pub fn list_challenges(
        &self,
        user_id: Uuid,
        status: Option<ChallengeStatus>,
    ) -> EngineResult<Vec<Challenge>> {
        Ok(self.store.list_challenges(user_id, status)?)
    }

    pub(crate) fn load(&self, challenge_id: Uuid) -> EngineResult<Challenge> {
        self.store
            .get_challenge(challenge_id)?
            .ok_or(EngineError::NotFound("challenge"))
    }
}
