#![allow(dead_code)]

use gridworld_core::{
    Direction, EnvConfig, EnvError, ObjectRef, ObjectRegistry, Position, Scenario, Transition,
    World, scenario::success_reward,
};

/// Walled room with objects at fixed cells and a fixed agent start.
pub struct FixedRoom {
    pub objects: Vec<(ObjectRef, Position)>,
    pub decor: Vec<(fn() -> ObjectRef, Position)>,
    pub start: Position,
    pub dir: Direction,
}

impl FixedRoom {
    pub fn new(start: Position, dir: Direction) -> Self {
        FixedRoom {
            objects: Vec::new(),
            decor: Vec::new(),
            start,
            dir,
        }
    }

    /// Registered object, reachable through the action space.
    pub fn with_object(mut self, object: ObjectRef, x: usize, y: usize) -> Self {
        self.objects.push((object, Position::new(x, y)));
        self
    }

    /// Anonymous object rebuilt on every reset.
    pub fn with_decor(mut self, make: fn() -> ObjectRef, x: usize, y: usize) -> Self {
        self.decor.push((make, Position::new(x, y)));
        self
    }
}

impl Scenario for FixedRoom {
    fn mission(&self) -> String {
        "reach the goal".to_string()
    }

    fn create_objects(&self, _config: &EnvConfig) -> Result<ObjectRegistry, EnvError> {
        let mut registry = ObjectRegistry::new();
        for (object, _) in &self.objects {
            registry.insert(object.clone())?;
        }
        Ok(registry)
    }

    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError> {
        let (width, height) = (world.grid.width(), world.grid.height());
        world.grid.wall_rect(0, 0, width, height);
        for (make, pos) in &self.decor {
            world.put_obj(make(), pos.x, pos.y);
        }
        for (object, pos) in &self.objects {
            world.put_obj(object.clone(), pos.x, pos.y);
        }
        Ok(())
    }

    fn place_agent(&mut self, world: &mut World) -> Result<Position, EnvError> {
        world.agent.pos = self.start;
        world.agent.dir = self.dir;
        Ok(self.start)
    }

    fn end_conditions(&self, _world: &World, _transition: &Transition) -> bool {
        false
    }

    fn reward(&self, world: &World, transition: &Transition) -> f64 {
        if transition.reached_goal {
            success_reward(world)
        } else {
            0.0
        }
    }
}
