use serde::{Deserialize, Serialize};

use crate::{
    EncodedGrid, Position,
    environment::{Env, EnvError, Scenario, World},
    object_grid::{ObjectGrid, VisibilityMask},
    visibility::process_vis,
};

/// What the agent gets back after every reset and step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// `view_size x view_size x 3` encoding of the agent's viewport, agent at the bottom center.
    pub image: EncodedGrid,
    pub direction: u8,
    pub mission: String,
}

impl World {
    /// Agent-relative view of the world and which of its cells are visible.
    ///
    /// The viewport is cut from the world (walls beyond the edges), rotated
    /// so the agent looks towards row 0, occluded unless `see_through_walls`.
    /// The agent's own cell shows only what it carries, never what it stands on.
    pub fn gen_obs_grid(&self, see_through_walls: bool) -> (ObjectGrid, VisibilityMask) {
        let size = self.agent.view_size();
        let (top_x, top_y, _, _) = self.agent.view_extents();

        let mut view = self.grid.slice(top_x, top_y, size, size);
        for _ in 0..=self.agent.dir.index() {
            view = view.rotate_left();
        }

        let viewer = Position::new(size / 2, size - 1);
        let mask = if see_through_walls {
            VisibilityMask::filled(size, size, true)
        } else {
            process_vis(&mut view, viewer)
        };

        view.clear(viewer.x, viewer.y);
        for held in &self.agent.carrying {
            view.set(viewer.x, viewer.y, held.clone());
        }
        (view, mask)
    }
}

impl<S: Scenario> Env<S> {
    pub fn gen_obs_grid(&self) -> (ObjectGrid, VisibilityMask) {
        self.world().gen_obs_grid(self.config().see_through_walls)
    }

    /// Encodes the current viewport. Fails if the mission is empty.
    pub fn gen_obs(&self) -> Result<Observation, EnvError> {
        if self.mission().trim().is_empty() {
            return Err(EnvError::MissingMission);
        }
        let (view, mask) = self.gen_obs_grid();
        Ok(Observation {
            image: view.encode(Some(&mask)),
            direction: self.agent().dir.index(),
            mission: self.mission().to_string(),
        })
    }
}
