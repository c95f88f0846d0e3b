use earth2d_sim::physiology::evaluate_death;
use earth2d_sim::{
    Action, BiomeTable, CauseOfDeath, Compass, CountingRng, DistanceBucket, Episode,
    EpisodeStatus, Heading, Hunter, HunterState, MapConfig, Position, SimConfig, SimEvent,
    StreamId, TrophyConfig, TrophyTracker, WorldGrid,
};
use earth2d_sim::hunters::HunterRules;
use earth2d_sim::RngBundle;

fn open_plains(width: u32, height: u32) -> MapConfig {
    let mut map = MapConfig::default();
    map.width = width;
    map.height = height;
    map.biome_weights = BiomeTable::splat(0.0);
    map.biome_weights.plains = 1.0;
    map.num_lakes = 0;
    map.num_rivers = 0;
    map
}

/// Scenario A: resting forever on the default map.
fn resting_run() -> Episode {
    let mut config = SimConfig::default();
    assert_eq!((config.map.width, config.map.height), (80, 60));
    config.sim.max_steps = 10_000;
    let mut episode = Episode::new(config, 42).unwrap();
    while !episode.status().is_terminal() {
        episode.step(Action::Rest);
    }
    episode
}

#[test]
fn scenario_a_resting_drains_until_death() {
    let episode = resting_run();
    let physiology = &episode.config().physiology;
    let mut hydration = physiology.initial_hydration;
    let mut energy = physiology.initial_energy;
    for event in episode.replay().events().iter().filter(|e| !e.status.is_terminal()) {
        assert!(
            (hydration - event.vitals.hydration - physiology.hydration_base_drain).abs() < 1e-9,
            "step {} drained {} hydration",
            event.step,
            hydration - event.vitals.hydration
        );
        let attacked = event
            .events
            .iter()
            .any(|ev| matches!(ev, SimEvent::WildlifeEncounter { .. }));
        if !attacked {
            assert!(
                (energy - event.vitals.energy - physiology.energy_base_drain).abs() < 1e-9,
                "step {} drained {} energy",
                event.step,
                energy - event.vitals.energy
            );
        }
        hydration = event.vitals.hydration;
        energy = event.vitals.energy;
    }

    assert_eq!(
        episode.status(),
        EpisodeStatus::Died {
            cause: CauseOfDeath::Hypothermia
        }
    );
    assert_eq!(episode.step_count(), 63);
    let again = resting_run();
    assert_eq!(again.step_count(), episode.step_count());
    assert_eq!(again.status(), episode.status());
}

#[test]
fn scenario_b_hunter_detection_and_hysteresis() {
    let mut rngs = RngBundle::from_user_seed(1);
    let world = WorldGrid::generate(&open_plains(40, 40), rngs.stream(StreamId::World));
    let rules = HunterRules {
        chase_speed: 2,
        patrol_speed: 1,
        hysteresis: 2,
        min_turn_interval: 5,
        turn_chance: 0.2,
    };
    let mut rng = CountingRng::new(5);
    let organism = Position::new(20, 20);
    let mut hunter = Hunter::new(0, Position::new(24, 20), 5, Heading::North);

    let t = hunter.tick(organism, &world, &rules, &mut rng);
    assert_eq!(t.map(|t| t.to), Some(HunterState::Chase));

    // Place the organism exactly radius + hysteresis away: chase continues.
    let at_limit = hunter.position().offset(-7, 0);
    assert!(hunter.tick(at_limit, &world, &rules, &mut rng).is_none());
    assert_eq!(hunter.state(), HunterState::Chase);

    // One cell further: back to patrol.
    let beyond = hunter.position().offset(-8, 0);
    let t = hunter.tick(beyond, &world, &rules, &mut rng);
    assert_eq!(t.map(|t| (t.from, t.to)), Some((HunterState::Chase, HunterState::Patrol)));
}

#[test]
fn scenario_b_patrol_outside_radius_stays_patrol() {
    let mut rngs = RngBundle::from_user_seed(1);
    let world = WorldGrid::generate(&open_plains(40, 40), rngs.stream(StreamId::World));
    let rules = HunterRules::from(&earth2d_sim::HunterConfig::default());
    let mut rng = CountingRng::new(8);
    let mut hunter = Hunter::new(0, Position::new(10, 10), 5, Heading::South);
    for _ in 0..5 {
        let far = hunter.position().offset(12, 0);
        assert!(hunter.tick(far, &world, &rules, &mut rng).is_none());
        assert_eq!(hunter.state(), HunterState::Patrol);
    }
}

#[test]
fn scenario_c_hint_schedule() {
    let cfg = TrophyConfig {
        enabled: true,
        hint_interval: 10,
        ..TrophyConfig::default()
    };
    let organism = Position::new(5, 5);
    let trophy_at = Position::new(25, 15);
    assert_eq!(organism.manhattan(trophy_at), 30);
    let mut tracker = TrophyTracker::new(trophy_at, cfg);

    for step in 0..=30 {
        let hint = tracker.hint(organism, step).unwrap();
        assert_eq!(hint.distance, DistanceBucket::Far);
        assert_eq!(hint.direction.is_some(), step % 10 == 0, "step {step}");
    }

    // Walk east then south; buckets follow the thresholds.
    let mut pos = organism;
    let mut step = 31;
    while pos != trophy_at {
        pos = if pos.x < trophy_at.x {
            pos.offset(1, 0)
        } else {
            pos.offset(0, 1)
        };
        let hint = tracker.hint(pos, step).unwrap();
        let d = pos.manhattan(trophy_at);
        assert_eq!(hint.distance, DistanceBucket::from_distance(d));
        step += 1;
    }
}

#[test]
fn scenario_c_episode_emits_direction_every_interval() {
    let mut config = SimConfig::default();
    config.trophy.enabled = true;
    config.trophy.hint_interval = 10;
    config.sim.max_steps = 35;
    config.physiology.thermal_drift_k = 0.0;
    config.difficulty.wildlife_multiplier = 0.0;
    let mut episode = Episode::new(config, 4).unwrap();
    let mut step = 0;
    loop {
        let hint = episode.observation().trophy.expect("trophy enabled and unfound");
        assert_eq!(hint.direction.is_some(), step % 10 == 0, "step {step}");
        if let Some(direction) = hint.direction {
            assert!(matches!(direction, Compass::N | Compass::E | Compass::S | Compass::W));
        }
        if episode.status().is_terminal() {
            break;
        }
        episode.step(Action::Rest);
        step += 1;
    }
    assert_eq!(step, 35);
}

#[test]
fn trophy_is_found_once_and_hints_stop() {
    let mut config = SimConfig::default();
    config.map = open_plains(40, 40);
    config.trophy.enabled = true;
    config.trophy.win_on_found = false;
    config.physiology.initial_hydration = 100.0;
    config.physiology.initial_energy = 100.0;
    config.physiology.thermal_drift_k = 0.0;
    config.difficulty.drain_multiplier = 0.1;
    config.difficulty.wildlife_multiplier = 0.0;
    config.sim.max_steps = 200;
    let mut episode = Episode::new(config, 19).unwrap();
    let target = episode.trophy().unwrap().position();

    let mut found_events = 0;
    while !episode.status().is_terminal() {
        let pos = episode.organism().position;
        let action = if episode.trophy().unwrap().found() {
            Action::Rest
        } else if pos.x < target.x {
            Action::MoveE
        } else if pos.x > target.x {
            Action::MoveW
        } else if pos.y < target.y {
            Action::MoveS
        } else {
            Action::MoveN
        };
        let outcome = episode.step(action);
        found_events += outcome
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::TrophyFound { .. }))
            .count();
        if episode.trophy().unwrap().found() {
            assert!(episode.observation().trophy.is_none());
            assert!(episode.observation().trophy_found);
        }
    }
    assert_eq!(found_events, 1);
    assert_eq!(episode.status(), EpisodeStatus::StepCap);
}

#[test]
fn trophy_win_ends_episode() {
    let mut config = SimConfig::default();
    config.map = open_plains(40, 40);
    config.trophy.enabled = true;
    config.physiology.thermal_drift_k = 0.0;
    config.difficulty.drain_multiplier = 0.1;
    config.difficulty.wildlife_multiplier = 0.0;
    let mut episode = Episode::new(config, 20).unwrap();
    let target = episode.trophy().unwrap().position();
    while !episode.status().is_terminal() {
        let pos = episode.organism().position;
        let action = if pos.x != target.x {
            if pos.x < target.x { Action::MoveE } else { Action::MoveW }
        } else if pos.y < target.y {
            Action::MoveS
        } else {
            Action::MoveN
        };
        episode.step(action);
    }
    assert_eq!(episode.status(), EpisodeStatus::Won);
    assert!(episode.replay().summary().is_some_and(|s| s.trophy_found));
}

#[test]
fn exactly_one_cause_of_death() {
    let config = SimConfig::from_json(include_str!("fixtures/full_features.json")).unwrap();
    for seed in 0..6_u64 {
        let mut episode = Episode::new(config.clone(), seed).unwrap();
        let mut script = CountingRng::new(seed + 100);
        while !episode.status().is_terminal() {
            episode.step(Action::ALL[script.index(Action::ALL.len())]);
        }
        let events = episode.replay().events();
        let deaths: Vec<CauseOfDeath> = events
            .iter()
            .flat_map(|e| &e.events)
            .filter_map(|ev| match ev {
                SimEvent::Died { cause } => Some(*cause),
                _ => None,
            })
            .collect();
        match episode.status() {
            EpisodeStatus::Died { cause } => {
                assert_eq!(deaths, vec![cause], "seed {seed}");
                let last = events.last().unwrap();
                let hunted = last
                    .hunters
                    .iter()
                    .any(|h| h.position.manhattan(last.position) <= 1);
                assert_eq!(
                    evaluate_death(&last.vitals, hunted, &config.physiology),
                    Some(cause),
                    "seed {seed}"
                );
            }
            _ => assert!(deaths.is_empty(), "seed {seed}"),
        }
    }
}
