// Copyright 2020 Zachary Stewart
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::{
    fmt,
    io::{self, BufRead, Write},
    time::Duration,
};

use clap::{value_t, App, Arg, ArgMatches};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, SeedableRng};
use regex::Regex;
use tokio::runtime::Runtime;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use seabattle::{
    config::{BOARD_SIZE, THINK_DELAY},
    dispatcher, AttackOutcome, AttackReport, BoardView, CellView, ConnectionId, Dimensions,
    EngineConfig, EngineHandle, Entrant, EventStream, Fleet, FleetError, GameError, GameEvent,
    Orientation, ParticipantId, Placement, Position, RandomStrategy, Seat, SessionId, ShipClass,
    Status,
};

/// Name the automated opponent plays under.
const OPPONENT: &str = "computer";

fn main() -> io::Result<()> {
    let matches = App::new("Seabattle")
        .version("1.0")
        .author("Zachary Stewart <zachary@zstewart.com>")
        .about("Play Battleship against an automated opponent.")
        .arg(
            Arg::with_name("first_player")
                .short("f")
                .long("first-player")
                .value_name("FIRST_PLAYER")
                .help("pre-specify which player goes first")
                .takes_value(true)
                .possible_values(&["human", "me", "computer", "bot", "random", "rand"])
                .case_insensitive(true),
        )
        .arg(
            Arg::with_name("size")
                .short("s")
                .long("size")
                .value_name("SIZE")
                .help("side length of the square board")
                .takes_value(true)
                .default_value("10")
                .validator(|v| match v.parse::<usize>() {
                    Ok(size) if size > 0 && size <= 99 => Ok(()),
                    _ => Err(format!("size must be a number in [1,99], got {}", v)),
                }),
        )
        .arg(
            Arg::with_name("think_ms")
                .long("think-ms")
                .value_name("MILLIS")
                .help("delay before the computer's moves, in milliseconds")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("seed for reproducible games")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("name")
                .short("n")
                .long("name")
                .value_name("NAME")
                .help("name to play under")
                .takes_value(true)
                .default_value("player"),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = engine_config(&matches);
    let name = matches.value_of("name").unwrap_or("player").to_owned();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let bot = match config.seed {
        Some(seed) => RandomStrategy::seeded(seed.wrapping_add(2)),
        None => RandomStrategy::new(),
    };

    let runtime = Runtime::new()?;
    let _guard = runtime.enter();
    let (engine, events, _task) = dispatcher::spawn(config.clone())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let mut game = Game {
        runtime: &runtime,
        engine,
        events,
        name,
    };

    let session = game.block_on(game.engine.create_session(
        Entrant::human(game.name.clone(), ConnectionId(0)),
        Entrant::automated(OPPONENT, bot),
    ))?;
    let me = game
        .block_on(game.engine.lookup(game.name.clone()))?
        .map(|entry| entry.participant)
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "session vanished"))?;
    debug!(%session, %me, "session created");

    let stdin = io::stdin();
    let mut input = InputReader::new(stdin.lock());
    let dim = config
        .dimensions()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "board size must be nonzero"))?;
    let placements = choose_placements(&mut rng, dim, &config.fleet, &mut input)?;
    game.block_on(game.engine.submit_fleet(session, me, placements))?;
    game.play(session, me, &mut input)
}

/// Build the engine config from the command line.
fn engine_config(matches: &ArgMatches) -> EngineConfig {
    let think_delay = if matches.is_present("think_ms") {
        Duration::from_millis(value_t!(matches, "think_ms", u64).unwrap_or_else(|e| e.exit()))
    } else {
        THINK_DELAY
    };
    let seed = if matches.is_present("seed") {
        Some(value_t!(matches, "seed", u64).unwrap_or_else(|e| e.exit()))
    } else {
        None
    };
    // The human always takes the first seat.
    let first_seat = match matches.value_of("first_player").map(str::to_ascii_lowercase) {
        Some(choice) => match choice.as_str() {
            "human" | "me" => Some(Seat::First),
            "computer" | "bot" => Some(Seat::Second),
            _ => None,
        },
        None => None,
    };
    EngineConfig {
        board_size: value_t!(matches, "size", usize).unwrap_or(BOARD_SIZE),
        think_delay,
        seed,
        first_seat,
        ..EngineConfig::default()
    }
}

/// Choose placements for the whole fleet using input from the player.
fn choose_placements(
    rng: &mut StdRng,
    dim: Dimensions,
    fleet: &[ShipClass],
    input: &mut InputReader<impl BufRead>,
) -> io::Result<Vec<Placement>> {
    enum Command {
        Done,
        Place(ShipClass, Position, Orientation),
        Undo,
        Clear,
        Randomize,
        Help,
    }
    /// Matcher for commands with args.
    static PLACE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^(?x)(?:place|put)\s+
        (?P<ship>\w+)\s+
        (?:(?:at|on|to|->|=>)\s+)?
        (?P<x>[0-9]+)(?:\s*,\s*|\s+)(?P<y>[0-9]+)\s+
        (?P<dir>\w+)$",
        )
        .unwrap()
    });

    let mut placements: Vec<Placement> = Vec::new();
    println!();
    println!("Place ships. Type help or ? for commands.");
    loop {
        println!();
        let remaining = remaining_classes(fleet, &placements);
        if remaining.is_empty() {
            println!("All ships placed, type done to start the game");
        } else {
            let names: Vec<_> = remaining.iter().map(|&class| ShipName(class).to_string()).collect();
            println!("Remaining ships to place: {}", names.join(", "));
        }
        println!("Your current board setup:");
        show_setup_board(dim, &placements);
        println!();

        let cmd = input.read_input_lower("> ", |input| match input {
            "?" | "help" | "h" => Some(Command::Help),
            "randomize" | "rand" | "random" => Some(Command::Randomize),
            "done" | "start" => Some(Command::Done),
            "undo" | "u" => Some(Command::Undo),
            "clear" => Some(Command::Clear),
            other => {
                if let Some(captures) = PLACE.captures(other) {
                    let ship = match parse_class(&captures["ship"]) {
                        Some(ship) => ship,
                        None => {
                            println!("invalid ship: {}, choose \"small\", \"medium\", \"large\", or \"huge\"", &captures["ship"]);
                            return None;
                        }
                    };
                    let x = parse_coord(&captures["x"], "x", dim.width())?;
                    let y = parse_coord(&captures["y"], "y", dim.height())?;
                    let dir = match &captures["dir"] {
                        "h" | "horizontal" | "right" | "r" | "east" | "e" => Orientation::Horizontal,
                        "v" | "vertical" | "down" | "d" | "south" | "s" => Orientation::Vertical,
                        other => {
                            println!("invalid direction {}, choose \"horizontal\" or \"vertical\"", other);
                            return None;
                        }
                    };
                    Some(Command::Place(ship, Position::new(x, y), dir))
                } else {
                    println!("Invalid ship-placement command \"{}\". Use '?' for help", other);
                    None
                }
            }
        })?;

        match cmd {
            Command::Done if remaining.is_empty() => return Ok(placements),
            Command::Done => println!("You must place all your ships first!"),
            Command::Place(ship, _, _) if !remaining.contains(&ship) => {
                println!("No {} left to place.", ShipName(ship));
            }
            Command::Place(ship, origin, dir) => {
                let mut candidate = placements.clone();
                candidate.push(Placement::new(ship, origin, dir));
                let classes: Vec<_> = candidate.iter().map(|p| p.class).collect();
                match Fleet::validate(dim, &classes, candidate) {
                    Ok(valid) => placements = valid.into_placements(),
                    Err(FleetError::Placement { reason, .. }) => {
                        println!("Invalid placement: {}.", reason);
                    }
                    Err(err) => println!("Invalid placement: {}.", err),
                }
            }
            Command::Undo => {
                placements.pop();
            }
            Command::Clear => placements.clear(),
            Command::Randomize => match Fleet::random(dim, fleet, rng) {
                Ok(random) => placements = random.into_placements(),
                Err(err) => println!("Could not arrange the fleet: {}.", err),
            },
            Command::Help => {
                println!(
                    "Available Commands:
    done                        if all ships are placed, start the game.
    place <ship> <x>,<y> <dir>  place the ship with its top-left cell at the given coordinate.
        Possible directions are \"horizontal\" and \"vertical\". See below for ships.
    undo                        remove the most recently placed ship.
    clear                       clears all ship placements.
    randomize                   replace all placements with a random layout.

Ships may not overlap or touch, not even diagonally.

Available Ships:
    \"huge\" (\"4\")
    \"large\" (\"3\")
    \"medium\" (\"2\")
    \"small\" (\"1\")",
                );
            }
        }
    }
}

/// Classes from `fleet` that have no placement yet.
fn remaining_classes(fleet: &[ShipClass], placements: &[Placement]) -> Vec<ShipClass> {
    let mut remaining = fleet.to_vec();
    for placement in placements {
        if let Some(idx) = remaining.iter().position(|&class| class == placement.class) {
            remaining.remove(idx);
        }
    }
    remaining
}

fn parse_class(input: &str) -> Option<ShipClass> {
    match input {
        "small" | "1" => Some(ShipClass::Small),
        "medium" | "2" => Some(ShipClass::Medium),
        "large" | "3" => Some(ShipClass::Large),
        "huge" | "4" => Some(ShipClass::Huge),
        _ => None,
    }
}

fn parse_coord(input: &str, axis: &str, bound: usize) -> Option<usize> {
    match input.parse() {
        Err(_) => {
            println!("invalid {}: {}", axis, input);
            None
        }
        Ok(v) if v >= bound => {
            println!("{} must be in range [0,{}], got {}", axis, bound - 1, v);
            None
        }
        Ok(v) => Some(v),
    }
}

/// State of a running game against the computer.
struct Game<'a> {
    runtime: &'a Runtime,
    engine: EngineHandle,
    events: EventStream,
    name: String,
}

impl Game<'_> {
    /// Wait on an engine request from the synchronous input loop.
    fn block_on<T>(
        &self,
        request: impl std::future::Future<Output = Result<T, GameError>>,
    ) -> io::Result<T> {
        self.runtime
            .block_on(request)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    /// Exchange attacks until the session is over.
    fn play(&mut self, session: SessionId, me: ParticipantId, input: &mut InputReader<impl BufRead>) -> io::Result<()> {
        static ATTACK: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(?:(?:attack|fire|shoot)\s+)?(?P<x>[0-9]+)(?:\s*,\s*|\s+)(?P<y>[0-9]+)$")
                .unwrap()
        });
        enum Command {
            Fire(Position),
            Random,
            Quit,
        }

        loop {
            while let Ok(event) = self.events.try_recv() {
                let done = is_final(&event);
                report(event, me);
                if done {
                    return Ok(());
                }
            }
            let view = match self.runtime.block_on(self.engine.view(session, me)) {
                Ok(view) => view,
                // The ending event is already queued.
                Err(GameError::SessionNotFound(_)) => continue,
                Err(err) => return Err(io::Error::new(io::ErrorKind::Other, err)),
            };
            if view.status != Status::Active || view.turn_owner != Some(me) {
                let event = match self.runtime.block_on(self.events.recv()) {
                    Some(event) => event,
                    None => return Ok(()),
                };
                let done = is_final(&event);
                report(event, me);
                if done {
                    return Ok(());
                }
                continue;
            }

            println!();
            println!("Enemy waters:");
            show_board(&view.target);
            println!("Your fleet:");
            show_board(&view.own);
            let dim = *view.target.dimensions();
            let cmd = input.read_input_lower("Your shot (x,y / random / quit) >", |input| match input {
                "random" | "rand" | "auto" => Some(Command::Random),
                "quit" | "q" | "exit" => Some(Command::Quit),
                other => match ATTACK.captures(other) {
                    Some(captures) => {
                        let x = parse_coord(&captures["x"], "x", dim.width())?;
                        let y = parse_coord(&captures["y"], "y", dim.height())?;
                        Some(Command::Fire(Position::new(x, y)))
                    }
                    None => {
                        println!("Invalid shot \"{}\".", other);
                        None
                    }
                },
            })?;
            let res = match cmd {
                Command::Fire(pos) => self.runtime.block_on(self.engine.attack(session, me, pos)),
                Command::Random => self.runtime.block_on(self.engine.random_attack(session, me)),
                Command::Quit => {
                    self.block_on(self.engine.disconnect(self.name.clone()))?;
                    println!("You left the game.");
                    return Ok(());
                }
            };
            if let Err(err) = res {
                match err {
                    GameError::CellAlreadyTargeted(_) | GameError::OutOfBounds(_) => println!("{}.", err),
                    err => {
                        warn!(%err, "attack refused");
                        println!("Attack refused: {}.", err);
                    }
                }
            }
        }
    }
}

/// Whether the event ends the game.
fn is_final(event: &GameEvent) -> bool {
    matches!(
        event,
        GameEvent::Finished { .. } | GameEvent::OpponentLeft { .. }
    )
}

/// Print an event.
fn report(event: GameEvent, me: ParticipantId) {
    match event {
        GameEvent::Started { turn_owner, .. } => {
            if turn_owner == me {
                println!("The battle begins. You go first.");
            } else {
                println!("The battle begins. The {} goes first.", OPPONENT);
            }
        }
        GameEvent::Attacked(attack) => {
            println!("{}", ShotSummary { report: &attack, me });
        }
        GameEvent::Finished { winner, .. } => {
            if winner == me {
                println!("You sank the whole fleet. You win!");
            } else {
                println!("Your fleet was destroyed. The {} wins.", OPPONENT);
            }
        }
        GameEvent::OpponentLeft { .. } => {
            println!("Your opponent left the game.");
        }
    }
}

/// One line description of an attack.
struct ShotSummary<'a> {
    report: &'a AttackReport,
    me: ParticipantId,
}

impl fmt::Display for ShotSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let report = self.report;
        if report.attacker == self.me {
            write!(f, "You fire at {}: ", report.position)?;
        } else {
            write!(f, "The {} fires at {}: ", OPPONENT, report.position)?;
        }
        match (report.outcome, report.ship) {
            (AttackOutcome::Miss, _) => f.write_str("miss."),
            (AttackOutcome::Shot, _) => f.write_str("hit!"),
            (AttackOutcome::Killed, Some(ship)) => write!(f, "{} sunk!", ShipName(ship)),
            (AttackOutcome::Killed, None) => f.write_str("sunk!"),
        }
    }
}

/// Print out the board while it is being set up.
fn show_setup_board(dim: Dimensions, placements: &[Placement]) {
    let mut cells = vec![CellView::Water; dim.total_size()];
    for pos in placements.iter().flat_map(|p| p.cells()) {
        if let Some(idx) = dim.try_linearize(pos) {
            cells[idx] = CellView::Ship;
        }
    }
    show_rows(dim.width(), cells.chunks(dim.width()));
}

fn show_board(board: &BoardView) {
    show_rows(board.dimensions().width(), board.rows());
}

/// Show the board by printing the grid.
fn show_rows<'a>(width: usize, rows: impl Iterator<Item = &'a [CellView]>) {
    print!("   ");
    for i in 0..width {
        print!("{:^4}", i);
    }
    println!();
    for (i, row) in rows.enumerate() {
        print!("{:>2} ", i);
        for &cell in row {
            print!("{:^4}", Cell(cell));
        }
        println!();
    }
}

/// Display helper for a single cell.
struct Cell(CellView);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self.0 {
            CellView::Water => "~~",
            CellView::Ship => "##",
            CellView::Miss => "x",
            CellView::Hit => "x#",
            CellView::Sunk => "X#",
        })
    }
}

/// Display helper that prints the ship's class name.
struct ShipName(ShipClass);

impl fmt::Display for ShipName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self.0 {
            ShipClass::Small => "small",
            ShipClass::Medium => "medium",
            ShipClass::Large => "large",
            ShipClass::Huge => "huge",
        })
    }
}

/// Helper to read input from the player.
struct InputReader<B> {
    read: B,
    buf: String,
}

impl<B> InputReader<B> {
    fn new(read: B) -> Self {
        Self {
            read,
            buf: String::new(),
        }
    }
}

impl<B: BufRead> InputReader<B> {
    /// Repeatedly tries to read input until the input checker returns `Some`. Converts
    /// to ascii lower before running the checker.
    fn read_input_lower<F, T>(&mut self, prompt: &str, mut checker: F) -> io::Result<T>
    where
        F: FnMut(&str) -> Option<T>,
    {
        loop {
            self.read_input_inner(prompt)?;
            self.buf.make_ascii_lowercase();
            if let Some(val) = checker(self.buf.trim()) {
                return Ok(val);
            }
        }
    }

    /// Helper to print the prompt, clear the string buffer and read a line.
    fn read_input_inner(&mut self, prompt: &str) -> io::Result<()> {
        print!("{} ", prompt);
        io::stdout().flush()?;
        self.buf.clear();
        if self.read.read_line(&mut self.buf)? == 0 {
            println!();
            std::process::exit(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_classes_counts_duplicates() {
        let fleet = [ShipClass::Small, ShipClass::Small, ShipClass::Huge];
        let placed = [Placement::new(
            ShipClass::Small,
            Position::new(0, 0),
            Orientation::Horizontal,
        )];
        assert_eq!(
            remaining_classes(&fleet, &placed),
            vec![ShipClass::Small, ShipClass::Huge]
        );
    }

    #[test]
    fn ship_names_parse_back() {
        for &class in ShipClass::ALL.iter() {
            assert_eq!(parse_class(&ShipName(class).to_string()), Some(class));
            assert_eq!(parse_class(&class.length().to_string()), Some(class));
        }
        assert_eq!(parse_class("carrier"), None);
    }

    #[test]
    fn only_endings_stop_the_game() {
        let session = SessionId(1);
        let me = ParticipantId(1);
        assert!(!is_final(&GameEvent::Started {
            session,
            turn_owner: me,
        }));
        assert!(is_final(&GameEvent::Finished {
            session,
            winner: ParticipantId(2),
        }));
        assert!(is_final(&GameEvent::OpponentLeft {
            session,
            opponent: me,
            opponent_name: "player".into(),
        }));
    }

    #[test]
    fn coordinates_are_bounded() {
        assert_eq!(parse_coord("3", "x", 10), Some(3));
        assert_eq!(parse_coord("10", "x", 10), None);
        assert_eq!(parse_coord("-1", "x", 10), None);
    }
}
