use gridworld_core::{
    Env, EnvConfig, EnvError, ObjectKind, Position,
    policy::{GoalSeeker, Policy},
    scenario::{MapError, MapScenario},
};

const TWO_ROOMS: &str = include_str!("../../maps/two_rooms.txt");

#[test]
fn map_file_builds_environment() {
    let scenario = MapScenario::parse(TWO_ROOMS).unwrap();
    assert_eq!((scenario.width(), scenario.height()), (10, 7));
    let config = scenario.configure(EnvConfig::default());
    let env = Env::new(config, scenario).unwrap();

    assert_eq!(env.agent().pos, Position::new(1, 1));
    assert!(env.grid()[(4, 3)].contains_kind(ObjectKind::Door));
    assert!(env.grid()[(8, 5)].contains_kind(ObjectKind::Goal));
    assert!(env.grid()[(7, 3)].contains_kind(ObjectKind::Lava));
    // row-major registration: key_0, ball_0, then door_0
    assert_eq!(env.action_space().len(), 3 + 2 + 2 + 3);
    assert_eq!(env.action_space().id_of("ball_0/pickup"), Some(5));
    assert_eq!(env.action_space().id_of("door_0/open"), Some(7));
}

#[test]
fn grid_size_must_match_map() {
    let scenario = MapScenario::parse(TWO_ROOMS).unwrap();
    let err = Env::new(EnvConfig::square(8), scenario).err();
    assert_eq!(
        err,
        Some(EnvError::Map(MapError::SizeMismatch {
            map_width: 10,
            map_height: 7,
            grid_width: 8,
            grid_height: 8,
        }))
    );
}

#[test]
fn goal_seeker_solves_two_rooms() {
    let scenario = MapScenario::parse(TWO_ROOMS).unwrap();
    let config = scenario.configure(EnvConfig::default());
    let mut env = Env::new(config, scenario).unwrap();
    let mut policy = GoalSeeker::new(3);

    let mut finished = None;
    for _ in 0..200 {
        let outcome = env.step(policy.act(&env.policy_view())).unwrap();
        if outcome.done {
            finished = Some(outcome);
            break;
        }
    }
    let outcome = finished.unwrap();
    assert!(outcome.info.reached_goal);
    assert!(outcome.reward > 0.9);
    assert_eq!(env.agent().pos, Position::new(8, 5));
}

#[test]
fn walking_into_lava_ends_the_episode() {
    let map = "
        WL WL WL WL WL
        WL ST LV GL WL
        WL WL WL WL WL
    ";
    let scenario = MapScenario::parse(map).unwrap();
    let config = scenario.configure(EnvConfig::default());
    let mut env = Env::new(config, scenario).unwrap();

    let outcome = env.step(gridworld_core::ActionSpace::FORWARD).unwrap();
    assert!(outcome.done);
    assert!(!outcome.info.reached_goal);
    assert_eq!(outcome.reward, 0.0);
}
