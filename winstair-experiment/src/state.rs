use crate::collaborators::{GateSignal, Presenter, ResponseSensor, TrialSink};
use crate::config::secs;
use crate::error::{ExperimentError, Result};
use crate::jitter::OnsetJitter;
use crate::layout::AnswerLayout;
use crate::session::{ExperimentSession, SessionOutcome, SessionSummary};
use crate::sequencer::Block;
use crate::trial::{TrialDurations, TrialPlan, TrialWaits};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, info};
use winstair_core::{SessionState, StaircasePhase, TrialRow, TrialState};
use winstair_timing::{Timer, WaitAccuracy};

/// Drives one session through
/// `Idle -> Instructions -> BaselinePhase -> BreakGate -> MainPhase -> Terminated`.
pub struct TrialSession<T, R>
where
    T: Timer,
    R: Rng,
{
    pub state: SessionState,
    pub session: ExperimentSession,
    pub timer: T,
    pub rng: R,
    pub jitter: OnsetJitter,
    pub durations: TrialDurations,
    pub block_title: Duration,
    pub rest: Duration,
    /// Completed trials across both phases.
    pub trial_number: usize,
    pub aborted: bool,
}

impl<T, R> TrialSession<T, R>
where
    T: Timer,
    R: Rng,
{
    pub fn new(session: ExperimentSession, timer: T, rng: R) -> Self {
        let timing = &session.config().timing;
        let durations = TrialDurations {
            intertrial_interval: secs(timing.intertrial_interval),
            difficulty_cue: secs(timing.difficulty_cue),
            prestimulus: secs(timing.prestimulus),
            presentation_window: secs(timing.presentation_window),
            post_stimulus_wait: secs(timing.post_stimulus_wait),
            answer_timeout: secs(timing.answer_timeout),
            stimulus: Duration::ZERO,
        };
        Self {
            state: SessionState::Idle,
            jitter: OnsetJitter::new(timing),
            block_title: secs(timing.block_title),
            rest: secs(timing.rest_duration),
            durations,
            session,
            timer,
            rng,
            trial_number: 0,
            aborted: false,
        }
    }

    /// Moves to the natural successor state. Entering `MainPhase` snapshots
    /// the baseline first.
    pub fn advance_state(&mut self) -> bool {
        match self.state.next() {
            Some(next) => {
                if next == SessionState::MainPhase {
                    self.session.begin_main();
                }
                info!(from = ?self.state, to = ?next, "session state");
                self.state = next;
                true
            }
            None => false,
        }
    }

    pub fn abort(&mut self) {
        info!(state = ?self.state, trials = self.trial_number, "session aborted");
        self.aborted = true;
        self.state = SessionState::Terminated;
    }

    pub fn outcome(&self) -> SessionOutcome {
        if self.aborted {
            SessionOutcome::Aborted
        } else {
            SessionOutcome::Completed
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.session.summary(self.outcome(), self.timer.wait_stats())
    }

    /// Runs until `Terminated`. A fatal error terminates the session; rows
    /// already handed to `sink` stay there.
    pub fn run<IO, K>(&mut self, io: &mut IO, sink: &mut K) -> Result<SessionSummary>
    where
        IO: Presenter + ResponseSensor + ?Sized,
        K: TrialSink + ?Sized,
    {
        while !self.state.is_terminated() {
            if let Err(e) = self.step(io, sink) {
                error!(error = %e, state = ?self.state, trials = self.trial_number, "session failed");
                self.state = SessionState::Terminated;
                return Err(e);
            }
        }
        let summary = self.summary();
        info!(
            outcome = ?summary.outcome,
            trials = summary.trials_recorded,
            degraded = summary.degraded_selections,
            "session finished"
        );
        Ok(summary)
    }

    /// Executes the current state to completion and transitions.
    pub fn step<IO, K>(&mut self, io: &mut IO, sink: &mut K) -> Result<()>
    where
        IO: Presenter + ResponseSensor + ?Sized,
        K: TrialSink + ?Sized,
    {
        match self.state {
            SessionState::Idle => {
                self.advance_state();
            }
            SessionState::Instructions => {
                io.show_instructions();
                self.gate(io);
            }
            SessionState::BreakGate => {
                io.show_break_gate();
                self.gate(io);
            }
            SessionState::BaselinePhase | SessionState::MainPhase => {
                let phase = self.state.staircase_phase().unwrap_or(StaircasePhase::Baseline);
                if self.run_phase(phase, io, sink)? {
                    self.advance_state();
                } else {
                    self.abort();
                }
            }
            SessionState::Terminated => {}
        }
        Ok(())
    }

    fn gate<IO: ResponseSensor + ?Sized>(&mut self, io: &mut IO) {
        match io.await_continue() {
            GateSignal::Continue => {
                self.advance_state();
            }
            GateSignal::Abort => self.abort(),
        }
    }

    /// Returns false when the participant aborted.
    fn run_phase<IO, K>(&mut self, phase: StaircasePhase, io: &mut IO, sink: &mut K) -> Result<bool>
    where
        IO: Presenter + ResponseSensor + ?Sized,
        K: TrialSink + ?Sized,
    {
        let blocks = self.session.blocks(phase).to_vec();
        let last = blocks.len();
        info!(%phase, blocks = last, "phase started");

        for block in &blocks {
            info!(
                %phase,
                block = block.number,
                condition = %block.condition,
                trials = block.trials,
                "block started"
            );
            io.show_block_title(block);
            self.timer.wait(self.block_title);

            for block_trial in 0..block.trials {
                if !self.run_trial(block, block_trial, io, sink)? {
                    return Ok(false);
                }
            }

            if block.rest_after && block.number < last {
                info!(block = block.number, seconds = self.rest.as_secs_f64(), "rest break");
                io.show_rest(self.rest);
                self.timer.wait(self.rest);
            }
        }
        Ok(true)
    }

    fn note_wait(&self, waits: &mut TrialWaits, state: TrialState, accuracy: WaitAccuracy) {
        if !accuracy.precise {
            debug!(
                trial = self.trial_number,
                period = ?state,
                requested_ms = accuracy.requested.as_secs_f64() * 1e3,
                actual_ms = accuracy.actual.as_secs_f64() * 1e3,
                "imprecise wait"
            );
        }
        waits.set(state, accuracy);
    }

    /// Runs and records one trial. Returns false when an abort was requested
    /// by the end of it.
    fn run_trial<IO, K>(&mut self, block: &Block, block_trial: usize, io: &mut IO, sink: &mut K) -> Result<bool>
    where
        IO: Presenter + ResponseSensor + ?Sized,
        K: TrialSink + ?Sized,
    {
        let phase = self.state.staircase_phase().unwrap_or(StaircasePhase::Baseline);
        let key = self.session.next_key(phase, block.condition, &mut self.rng)?;
        let mut waits = TrialWaits::default();

        // selection and stimulus preparation happen inside the intertrial interval
        let iti = self.timer.start_period(self.durations.intertrial_interval);
        let (intensity, params) = self.session.decide(&key)?;
        let selection = self.session.select(&key, &mut self.rng)?;
        let layout = AnswerLayout::shuffle(&selection.item, &mut self.rng);
        let mut plan = TrialPlan {
            trial_number: self.trial_number,
            key,
            block_number: block.number,
            block_trial,
            key_trial: params.key_trial,
            intensity,
            item: selection.item,
            layout,
            degraded_selection: selection.degraded,
            durations: self.durations,
            onset: Duration::ZERO,
            state: TrialState::IntertrialInterval,
        };
        plan.durations.stimulus = io.prepare(&plan);
        plan.onset = self.jitter.draw(plan.durations.stimulus, &mut self.rng);
        let accuracy = iti.complete(&mut self.timer);
        self.note_wait(&mut waits, TrialState::IntertrialInterval, accuracy);

        plan.state = TrialState::DifficultyCue;
        io.show_difficulty_cue(key.difficulty);
        let accuracy = self.timer.wait(self.durations.difficulty_cue);
        self.note_wait(&mut waits, plan.state, accuracy);

        plan.state = TrialState::Prestimulus;
        let accuracy = self.timer.wait(self.durations.prestimulus);
        self.note_wait(&mut waits, plan.state, accuracy);

        plan.state = TrialState::Presentation;
        let window = self.timer.start_period(self.durations.presentation_window);
        io.present(&plan);
        let accuracy = window.complete(&mut self.timer);
        self.note_wait(&mut waits, plan.state, accuracy);

        plan.state = TrialState::PostStimulusWait;
        let accuracy = self.timer.wait(self.durations.post_stimulus_wait);
        self.note_wait(&mut waits, plan.state, accuracy);

        plan.state = TrialState::AnswerChoice;
        io.show_answer_choices(&plan.layout);
        let response = io.await_response(self.durations.answer_timeout, &plan.layout);

        let answer = response.position();
        let correct = plan.layout.is_correct(answer);
        self.session.record(key, intensity, correct)?;

        let row = TrialRow {
            trial_number: plan.trial_number,
            phase: key.phase,
            condition: key.condition,
            difficulty: key.difficulty,
            block_number: plan.block_number,
            block_trial: plan.block_trial,
            key_trial: plan.key_trial,
            intensity,
            target: plan.item.target.to_string(),
            answer_position: answer,
            answer_choice: answer.and_then(|p| plan.layout.choice_at(p)).map(|w| w.to_string()),
            correct,
            reaction_time_ms: response.reaction_time().map(|rt| rt.as_secs_f64() * 1e3),
            onset_s: plan.onset.as_secs_f64(),
            offset_s: plan.offset().as_secs_f64(),
            degraded_selection: plan.degraded_selection,
            intertrial_interval_precise: TrialWaits::precise(waits.intertrial_interval),
            difficulty_cue_precise: TrialWaits::precise(waits.difficulty_cue),
            prestimulus_precise: TrialWaits::precise(waits.prestimulus),
            presentation_window_precise: TrialWaits::precise(waits.presentation_window),
            post_stimulus_wait_precise: TrialWaits::precise(waits.post_stimulus_wait),
        };
        sink.record_trial_row(&row)
            .map_err(|e| ExperimentError::Sink(e.to_string()))?;

        info!(
            trial = plan.trial_number,
            key = %key,
            key_trial = plan.key_trial,
            intensity,
            target = %plan.item.target,
            correct,
            timed_out = answer.is_none(),
            "trial recorded"
        );
        self.trial_number += 1;

        if io.abort_requested() {
            info!(trial = plan.trial_number, key = %key, "abort requested after trial");
            return Ok(false);
        }
        Ok(true)
    }
}
