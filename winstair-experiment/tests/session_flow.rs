use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use winstair_core::{
    AnswerPosition, Condition, Difficulty, Response, SessionState, StaircaseKey, StaircasePhase, StimulusItem,
    TrialRow,
};
use winstair_experiment::config::Interleave;
use winstair_experiment::{
    AnswerLayout, Block, ExperimentConfig, ExperimentError, ExperimentSession, GateSignal, Presenter, ResponseSensor,
    SessionOutcome, StimulusPool, TrialPlan, TrialSession,
};
use winstair_timing::VirtualTimer;

/// Answers by trial count: every `miss_every`-th answer is wrong and every
/// `timeout_every`-th times out.
#[derive(Default)]
struct ScriptedRig {
    answered: usize,
    miss_every: Option<usize>,
    timeout_every: Option<usize>,
    abort_on_trial: Option<usize>,
    gates: Vec<GateSignal>,
    rests: usize,
    blocks_shown: Vec<usize>,
    presented: usize,
}

impl Presenter for ScriptedRig {
    fn show_block_title(&mut self, block: &Block) {
        self.blocks_shown.push(block.number);
    }

    fn prepare(&mut self, _plan: &TrialPlan) -> Duration {
        Duration::from_millis(800)
    }

    fn present(&mut self, _plan: &TrialPlan) {
        self.presented += 1;
    }

    fn show_rest(&mut self, _duration: Duration) {
        self.rests += 1;
    }
}

impl ResponseSensor for ScriptedRig {
    fn await_response(&mut self, _timeout: Duration, layout: &AnswerLayout) -> Response {
        self.answered += 1;
        let n = self.answered;
        if self.timeout_every.is_some_and(|k| n % k == 0) {
            return Response::TimedOut;
        }
        let target = layout.target_position().unwrap_or(AnswerPosition::Left);
        let position = if self.miss_every.is_some_and(|k| n % k == 0) {
            layout.positions().find(|p| *p != target).unwrap_or(target)
        } else {
            target
        };
        Response::Answered {
            position,
            reaction_time: Duration::from_millis(500 + (n as u64 % 7) * 40),
        }
    }

    fn abort_requested(&mut self) -> bool {
        self.abort_on_trial == Some(self.answered)
    }

    fn await_continue(&mut self) -> GateSignal {
        if self.gates.is_empty() {
            GateSignal::Continue
        } else {
            self.gates.remove(0)
        }
    }
}

fn config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.seed = Some(17);
    config.conditions = vec![Condition::Auditory, Condition::Visual];
    config.baseline.trials_per_block = 6;
    config.baseline.blocks_per_condition = 1;
    config.main.trials_per_block = 20;
    config.main.blocks_per_condition = 2;
    config.main.rest_after_blocks = vec![2];
    config
}

/// `per_partition` items in every partition of `config`. Conditions share
/// target words, so only the session-wide recency window keeps them apart.
fn pool(config: &ExperimentConfig, per_partition: usize) -> StimulusPool {
    let mut pool = StimulusPool::new();
    for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
        for key in StaircaseKey::all_for(phase, &config.conditions) {
            for i in 0..per_partition {
                let target = format!("{}_{}_{i}", key.phase, key.difficulty);
                let distractors = ["a", "b", "c"].map(|s| format!("{target}_{}_{s}", key.condition));
                pool.insert(key, StimulusItem::new(target.as_str(), distractors.iter().map(String::as_str)));
            }
        }
    }
    pool
}

fn run(config: ExperimentConfig, pool: StimulusPool, rig: &mut ScriptedRig) -> (Outcome, Vec<TrialRow>) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or(0));
    let session = ExperimentSession::new(config, pool, &mut rng).unwrap();
    let mut trials = TrialSession::new(session, VirtualTimer::new(), rng);
    let mut rows = Vec::new();
    let result = trials.run(rig, &mut rows);
    assert!(trials.state.is_terminated());
    (result, rows)
}

type Outcome = winstair_experiment::Result<winstair_experiment::SessionSummary>;

fn by_key(rows: &[TrialRow]) -> BTreeMap<StaircaseKey, Vec<&TrialRow>> {
    let mut map: BTreeMap<StaircaseKey, Vec<&TrialRow>> = BTreeMap::new();
    for row in rows {
        map.entry(row.key()).or_default().push(row);
    }
    map
}

#[test]
fn every_trial_is_recorded_once() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        miss_every: Some(3),
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    let summary = result.unwrap();

    assert_eq!(summary.outcome, SessionOutcome::Completed);
    assert_eq!(rows.len(), 6 * 2 + 20 * 4);
    assert_eq!(summary.trials_recorded, rows.len());
    assert_eq!(rig.presented, rows.len());
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.trial_number, i);
    }
    for (key, key_rows) in by_key(&rows) {
        for (n, row) in key_rows.iter().enumerate() {
            assert_eq!(row.key_trial, n, "{key}");
        }
    }
    let per_key_total: usize = summary.per_key.iter().map(|k| k.trials).sum();
    assert_eq!(per_key_total, rows.len());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["outcome"], "completed");
    assert_eq!(json["trials_recorded"], 92);
    let row = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(row["phase"], "baseline");
}

#[test]
fn baseline_runs_before_main_with_break_and_rest() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig::default();
    let (result, rows) = run(config, pool, &mut rig);
    result.unwrap();

    let first_main = rows.iter().position(|r| r.phase == StaircasePhase::Main).unwrap();
    assert_eq!(first_main, 12);
    assert!(rows[first_main..].iter().all(|r| r.phase == StaircasePhase::Main));
    // two baseline blocks, then main blocks 1..=4
    assert_eq!(rig.blocks_shown, [1, 2, 1, 2, 3, 4]);
    assert_eq!(rig.rests, 1);
}

#[test]
fn sequential_interleave_alternates_within_a_condition() {
    let config = config();
    assert_eq!(config.main.interleave, Interleave::Sequential);
    let pool = pool(&config, 30);
    let (result, rows) = run(config, pool, &mut ScriptedRig::default());
    result.unwrap();
    for condition in [Condition::Auditory, Condition::Visual] {
        let difficulties: Vec<_> = rows
            .iter()
            .filter(|r| r.phase == StaircasePhase::Main && r.condition == condition)
            .map(|r| r.difficulty)
            .collect();
        assert_eq!(difficulties.len(), 40);
        for (i, d) in difficulties.iter().enumerate() {
            let expected = if i % 2 == 0 { Difficulty::Easy } else { Difficulty::Hard };
            assert_eq!(*d, expected);
        }
    }
}

#[test]
fn main_phase_starts_from_baseline_and_respects_cadence() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        miss_every: Some(2),
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    result.unwrap();
    let keys = by_key(&rows);

    for (key, main_rows) in keys.iter().filter(|(k, _)| k.phase == StaircasePhase::Main) {
        let baseline_last = keys[&key.baseline_counterpart()].last().unwrap().intensity;
        let first = main_rows[0].intensity;
        assert_eq!(first, baseline_last, "{key}");

        for n in 1..main_rows.len() {
            let (prev, cur) = (main_rows[n - 1].intensity, main_rows[n].intensity);
            if n < 8 {
                assert_eq!(cur, first, "{key} drifted during hold at {n}");
            }
            if cur != prev {
                assert!(n >= 8 && n % 3 == 0, "{key} changed at {n}");
            }
        }
    }
}

#[test]
fn same_seed_same_session() {
    let make = || {
        let config = config();
        let pool = pool(&config, 30);
        let mut rig = ScriptedRig {
            miss_every: Some(3),
            timeout_every: Some(11),
            ..Default::default()
        };
        let (result, rows) = run(config, pool, &mut rig);
        (result.unwrap(), rows)
    };
    let (a_summary, a_rows) = make();
    let (b_summary, b_rows) = make();
    assert_eq!(a_rows, b_rows);
    assert_eq!(a_summary.per_key, b_summary.per_key);
}

#[test]
fn main_targets_do_not_repeat_within_window() {
    let config = config();
    let pool = pool(&config, 30);
    let (result, rows) = run(config, pool, &mut ScriptedRig::default());
    result.unwrap();

    let main: Vec<&TrialRow> = rows.iter().filter(|r| r.phase == StaircasePhase::Main).collect();
    for i in 0..main.len() {
        if main[i].degraded_selection {
            continue;
        }
        let earlier = &main[i.saturating_sub(20)..i];
        assert!(
            earlier.iter().all(|r| r.target != main[i].target),
            "{} repeated within 20 selections",
            main[i].target
        );
    }
}

#[test]
fn shared_targets_force_degraded_selections() {
    let config = config();
    let mut pool = pool(&config, 0);
    for phase in [StaircasePhase::Baseline, StaircasePhase::Main] {
        for key in StaircaseKey::all_for(phase, &config.conditions) {
            for i in 0..20 {
                pool.insert(key, StimulusItem::new("same", [format!("other_{i}").as_str()]));
            }
        }
    }
    let (result, rows) = run(config, pool, &mut ScriptedRig::default());
    let summary = result.unwrap();
    let degraded = rows.iter().filter(|r| r.degraded_selection).count();
    assert!(degraded > 0);
    assert_eq!(summary.degraded_selections, degraded);
    assert!(rows.iter().filter(|r| r.phase == StaircasePhase::Baseline).all(|r| !r.degraded_selection));
}

#[test]
fn timeouts_are_incorrect_trials_without_answer() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        timeout_every: Some(5),
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    result.unwrap();
    let timed_out: Vec<_> = rows.iter().filter(|r| r.reaction_time_ms.is_none()).collect();
    assert_eq!(timed_out.len(), rows.len() / 5);
    for row in timed_out {
        assert!(!row.correct);
        assert_eq!(row.answer_position, None);
        assert_eq!(row.answer_choice, None);
    }
    assert!(rows.iter().filter(|r| r.reaction_time_ms.is_some()).all(|r| r.correct));
}

#[test]
fn abort_after_a_trial_keeps_that_trial_and_stops() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        abort_on_trial: Some(15),
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    let summary = result.unwrap();
    assert_eq!(summary.outcome, SessionOutcome::Aborted);
    assert_eq!(rows.len(), 15);
    assert_eq!(summary.trials_recorded, 15);
    assert_eq!(rig.answered, 15);
    assert_eq!(rows.last().unwrap().trial_number, 14);
}

#[test]
fn abort_at_instructions_runs_nothing() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        gates: vec![GateSignal::Abort],
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    assert_eq!(result.unwrap().outcome, SessionOutcome::Aborted);
    assert!(rows.is_empty());
    assert_eq!(rig.presented, 0);
}

#[test]
fn abort_at_break_gate_keeps_baseline() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rig = ScriptedRig {
        gates: vec![GateSignal::Continue, GateSignal::Abort],
        ..Default::default()
    };
    let (result, rows) = run(config, pool, &mut rig);
    assert_eq!(result.unwrap().outcome, SessionOutcome::Aborted);
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|r| r.phase == StaircasePhase::Baseline));
}

#[test]
fn exhausted_partition_ends_the_session_with_an_error() {
    let config = config();
    // main keys need 20 items each
    let pool = pool(&config, 5);
    let mut rig = ScriptedRig::default();
    let (result, rows) = run(config, pool, &mut rig);
    match result {
        Err(ExperimentError::PoolExhausted(key)) => assert_eq!(key.phase, StaircasePhase::Main),
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
    assert!(rows.len() > 12);
    assert_eq!(rows.iter().filter(|r| r.phase == StaircasePhase::Baseline).count(), 12);
}

#[test]
fn malformed_pool_is_rejected_before_any_trial() {
    let config = config();
    let mut pool = pool(&config, 30);
    pool.insert(
        StaircaseKey::new(StaircasePhase::Main, Condition::Visual, Difficulty::Hard),
        StimulusItem::new("lonely", std::iter::empty::<&str>()),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = ExperimentSession::new(config, pool, &mut rng).unwrap_err();
    assert!(matches!(err, ExperimentError::MalformedPool { .. }));
}

#[test]
fn fresh_session_starts_idle() {
    let config = config();
    let pool = pool(&config, 30);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let session = ExperimentSession::new(config, pool, &mut rng).unwrap();
    assert_eq!(session.blocks(StaircasePhase::Main).len(), 4);
    let trials = TrialSession::new(session, VirtualTimer::new(), rng);
    assert_eq!(trials.state, SessionState::Idle);
}
