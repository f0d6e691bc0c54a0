use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridworld_core::{
    CellContents, Color as CellColor, Env, EnvConfig, EnvError, ObjectKind, ObjectRegistry,
    Position, Scenario, StepOutcome, Transition, World,
    encoding::EMPTY,
    object::OpenState,
    policy::{GoalSeeker, Policy, RandomPolicy},
    scenario::{DoorKey, GoalRoom, MapScenario},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use serde::Deserialize;
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ScenarioName {
    GoalRoom,
    DoorKey,
    Map,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PolicyName {
    Seeker,
    Random,
}

#[derive(Parser, Debug)]
#[command(version, about = "Terminal viewer for a grid world simulation", long_about = None)]
struct Args {
    /// Environment configuration (TOML)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Built-in scenario to run
    #[arg(short, long, value_enum, default_value_t = ScenarioName::DoorKey)]
    scenario: ScenarioName,

    /// Map file to load; implies `--scenario map`
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Policy driving the agent
    #[arg(short, long, value_enum, default_value_t = PolicyName::Seeker)]
    policy: PolicyName,

    /// Milliseconds between simulation steps [default: 250]
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Where log output goes; the terminal belongs to the viewer
    #[arg(long, value_name = "LOG_FILE", default_value = "gridworld.log")]
    log_file: PathBuf,
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewerConfig {
    env: EnvConfig,
    tick_ms: Option<u64>,
}

/// The scenario picked on the command line.
enum SelectedScenario {
    GoalRoom(GoalRoom),
    DoorKey(DoorKey),
    Map(MapScenario),
}

impl Scenario for SelectedScenario {
    fn mission(&self) -> String {
        match self {
            SelectedScenario::GoalRoom(s) => s.mission(),
            SelectedScenario::DoorKey(s) => s.mission(),
            SelectedScenario::Map(s) => s.mission(),
        }
    }

    fn create_objects(&self, config: &EnvConfig) -> Result<ObjectRegistry, EnvError> {
        match self {
            SelectedScenario::GoalRoom(s) => s.create_objects(config),
            SelectedScenario::DoorKey(s) => s.create_objects(config),
            SelectedScenario::Map(s) => s.create_objects(config),
        }
    }

    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError> {
        match self {
            SelectedScenario::GoalRoom(s) => s.gen_objs(world),
            SelectedScenario::DoorKey(s) => s.gen_objs(world),
            SelectedScenario::Map(s) => s.gen_objs(world),
        }
    }

    fn place_agent(&mut self, world: &mut World) -> Result<Position, EnvError> {
        match self {
            SelectedScenario::GoalRoom(s) => s.place_agent(world),
            SelectedScenario::DoorKey(s) => s.place_agent(world),
            SelectedScenario::Map(s) => s.place_agent(world),
        }
    }

    fn end_conditions(&self, world: &World, transition: &Transition) -> bool {
        match self {
            SelectedScenario::GoalRoom(s) => s.end_conditions(world, transition),
            SelectedScenario::DoorKey(s) => s.end_conditions(world, transition),
            SelectedScenario::Map(s) => s.end_conditions(world, transition),
        }
    }

    fn reward(&self, world: &World, transition: &Transition) -> f64 {
        match self {
            SelectedScenario::GoalRoom(s) => s.reward(world, transition),
            SelectedScenario::DoorKey(s) => s.reward(world, transition),
            SelectedScenario::Map(s) => s.reward(world, transition),
        }
    }
}

struct App {
    /// The simulation being watched.
    env: Env<SelectedScenario>,
    policy: Box<dyn Policy>,
    last: Option<StepOutcome>,
    total_reward: f64,
    paused: bool,
    should_quit: bool,
}

impl App {
    fn new(args: &Args, mut config: EnvConfig) -> Result<Self> {
        if let Some(seed) = args.seed {
            config.seed = seed;
        }

        let scenario = match (&args.map, args.scenario) {
            (Some(path), _) => SelectedScenario::Map(load_map(path)?),
            (None, ScenarioName::Map) => {
                return Err(anyhow::anyhow!("--scenario map needs a --map file"));
            }
            (None, ScenarioName::GoalRoom) => SelectedScenario::GoalRoom(GoalRoom),
            (None, ScenarioName::DoorKey) => SelectedScenario::DoorKey(DoorKey),
        };
        if let SelectedScenario::Map(map) = &scenario {
            config = map.configure(config);
        }

        let policy: Box<dyn Policy> = match args.policy {
            PolicyName::Seeker => Box::new(GoalSeeker::new(config.seed)),
            PolicyName::Random => Box::new(RandomPolicy::new(config.seed)),
        };
        info!(
            scenario = ?args.scenario,
            policy = ?args.policy,
            seed = config.seed,
            "starting viewer"
        );
        let env = Env::new(config, scenario).context("failed to build the environment")?;

        Ok(App {
            env,
            policy,
            last: None,
            total_reward: 0.0,
            paused: false,
            should_quit: false,
        })
    }

    /// Handles one step of the simulation. A finished episode is replaced by a fresh one.
    fn tick(&mut self) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        if self.last.as_ref().is_some_and(|outcome| outcome.done) {
            self.env.reset()?;
            self.last = None;
            self.total_reward = 0.0;
            return Ok(());
        }
        let action = self.policy.act(&self.env.policy_view());
        let outcome = self.env.step(action)?;
        self.total_reward += outcome.reward;
        self.last = Some(outcome);
        Ok(())
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn load_config(path: &Path) -> Result<ViewerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: ViewerConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

fn load_map(path: &Path) -> Result<MapScenario> {
    if !path.exists() {
        return Err(anyhow::anyhow!("Map file does not exist: {}", path.display()));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read map file {}", path.display()))?;
    MapScenario::parse(&text).with_context(|| format!("invalid map file {}", path.display()))
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ViewerConfig::default(),
    };
    let tick_rate = Duration::from_millis(args.tick_ms.or(config.tick_ms).unwrap_or(250));
    let mut app = App::new(&args, config.env)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;

    if let Err(err) = &result {
        error!(%err, "viewer stopped");
    }
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(frame.area());
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ])
        .split(main_layout[0]);

    render_world(frame, panels[0], &app.env);
    render_observation(frame, panels[1], &app.env);
    render_status(frame, panels[2], app);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit, space to pause.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[1]);
}

fn cell_color(color: CellColor) -> Color {
    match color {
        CellColor::Red => Color::Red,
        CellColor::Green => Color::Green,
        CellColor::Blue => Color::Blue,
        CellColor::Purple => Color::Magenta,
        CellColor::Yellow => Color::Yellow,
        CellColor::Grey => Color::DarkGray,
    }
}

/// Glyph for an encoded `[type, color, state]` triple.
fn glyph(cell: [u8; 3]) -> Span<'static> {
    let [type_idx, color_idx, state] = cell;
    let Some(kind) = ObjectKind::from_index(type_idx) else {
        return Span::raw("??");
    };
    let fg = CellColor::from_index(color_idx)
        .map(cell_color)
        .unwrap_or(Color::White);
    let text = match kind {
        ObjectKind::Unseen => return Span::raw("  "),
        ObjectKind::Empty => return Span::styled(" .", Style::default().fg(Color::DarkGray)),
        ObjectKind::Wall => "##",
        ObjectKind::Floor => "..",
        ObjectKind::Door => match OpenState::from_index(state) {
            Some(OpenState::Open) => "[]",
            Some(OpenState::Locked) => "LL",
            _ => "DD",
        },
        ObjectKind::Key => " k",
        ObjectKind::Ball => " o",
        ObjectKind::Container => " b",
        ObjectKind::Goal => "GG",
        ObjectKind::Lava => "~~",
        ObjectKind::Agent => "@@",
    };
    Span::styled(text, Style::default().fg(fg))
}

/// Glyph for the top occupant of a cell. Stacks are drawn from their
/// occupants rather than from the summed encoding, which may not decode.
fn cell_glyph(cell: &CellContents) -> Span<'static> {
    let top = cell
        .objects()
        .last()
        .map_or(EMPTY, |object| object.borrow().encode());
    glyph(top)
}

fn agent_span(arrow: char) -> Span<'static> {
    Span::styled(
        format!("{arrow}{arrow}"),
        Style::default().fg(Color::Red).bold(),
    )
}

/// Renders the whole world, with the cells the agent sees highlighted.
fn render_world(frame: &mut Frame, area: Rect, env: &Env<SelectedScenario>) {
    let grid = env.grid();
    let highlight = env.highlight_mask();
    let agent = env.agent();

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let span = if agent.pos == Position::new(x, y) {
                agent_span(agent.dir.arrow())
            } else {
                cell_glyph(&grid[(x, y)])
            };
            if highlight[(x, y)] {
                spans.push(span.bg(Color::Rgb(45, 45, 60)));
            } else {
                spans.push(span);
            }
        }
        lines.push(Line::from(spans));
    }

    let world = Paragraph::new(lines)
        .block(Block::default().title("Grid World").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(world, area);
}

/// Renders the agent's own view: its rotated viewport with hidden cells blank.
fn render_observation(frame: &mut Frame, area: Rect, env: &Env<SelectedScenario>) {
    let (view, mask) = env.gen_obs_grid();
    let size = env.agent().view_size();
    let viewer = Position::new(size / 2, size - 1);

    let mut lines: Vec<Line> = Vec::with_capacity(view.height());
    for y in 0..view.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(view.width());
        for x in 0..view.width() {
            let span = if !mask[(x, y)] {
                Span::raw("  ")
            } else if viewer == Position::new(x, y) && view[(x, y)].is_empty() {
                agent_span('^')
            } else {
                cell_glyph(&view[(x, y)])
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let observation = Paragraph::new(lines)
        .block(Block::default().title("Observation").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(observation, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.env;
    let carried: Vec<String> = env
        .agent()
        .carrying
        .iter()
        .map(|object| object.borrow().name().to_string())
        .collect();
    let (reward, done, action_done) = match &app.last {
        Some(outcome) => (outcome.reward, outcome.done, outcome.info.action_done),
        None => (0.0, false, true),
    };

    let rows = [
        format!("Mission: {}", env.mission()),
        format!("Episode: {}", env.episode()),
        format!(
            "Step: {} ({} left)",
            env.step_count(),
            env.steps_remaining()
        ),
        format!("Reward: {reward:.3} (total {:.3})", app.total_reward),
        format!("Done: {done}  Last action done: {action_done}"),
        format!(
            "Agent: ({}, {}) facing {:?}",
            env.agent().pos.x,
            env.agent().pos.y,
            env.agent().dir
        ),
        format!(
            "Carrying: {}",
            if carried.is_empty() {
                "nothing".to_string()
            } else {
                carried.join(", ")
            }
        ),
        format!("Fingerprint: {}", env.fingerprint(16)),
        format!("Actions: {}", env.action_space().len()),
        if app.paused {
            "PAUSED".to_string()
        } else {
            String::new()
        },
    ];
    let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();

    let status = List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config: ViewerConfig = toml::from_str(include_str!("../../maps/viewer.toml")).unwrap();
        assert_eq!(config.tick_ms, Some(200));
        assert_eq!(config.env.width, 10);
        assert_eq!(config.env.seed, 7);
        assert_eq!(config.env.objects.len(), 2);
        assert_eq!(config.env.objects[0].kind, ObjectKind::Ball);
        assert_eq!(config.env.objects[0].color, Some(CellColor::Purple));
        assert_eq!(config.env.validate(), Ok(()));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ViewerConfig = toml::from_str("[env]\nwidth = 6\n").unwrap();
        assert_eq!(config.tick_ms, None);
        assert_eq!(config.env.width, 6);
        assert_eq!(config.env.height, EnvConfig::default().height);
    }

    #[test]
    fn glyphs_follow_encoding() {
        assert_eq!(glyph([0, 0, 0]).content, "  ");
        assert_eq!(glyph([2, 5, 0]).content, "##");
        assert_eq!(glyph([4, 4, 2]).content, "LL");
        assert_eq!(glyph([4, 4, 0]).content, "[]");
        assert_eq!(glyph([42, 0, 0]).content, "??");
    }

    #[test]
    fn stacked_cells_draw_their_top_occupant() {
        use gridworld_core::object::{Ball, Floor, Key, shared};

        let carried = CellContents::Multiple(vec![
            shared(Key::new(CellColor::Yellow, "key_0")),
            shared(Ball::new(CellColor::Red, "ball_0")),
        ]);
        // the summed triple [11, 6, 0] has no glyph of its own
        assert_eq!(glyph(carried.encode()).content, "??");
        assert_eq!(cell_glyph(&carried).content, " o");

        let mut on_floor = CellContents::Single(shared(Floor::default()));
        on_floor.push(shared(Key::default()));
        assert_eq!(cell_glyph(&on_floor).content, " k");
        assert_eq!(cell_glyph(&CellContents::Empty).content, " .");
    }

    #[test]
    fn selected_scenario_delegates() {
        let env = Env::new(
            EnvConfig::square(8),
            SelectedScenario::DoorKey(DoorKey),
        )
        .unwrap();
        assert_eq!(env.mission(), DoorKey.mission());
        assert!(env.action_space().id_of("door_0/open").is_some());
    }
}
