use std::io::{self, BufRead, Write};

use crate::{
    attacks::initialize_attack_tables,
    engine::Engine,
    gamestate::GameState,
    search::SearchLimits,
};

const ENGINE_NAME: &str = "Lodestone";
const ENGINE_AUTHOR: &str = "Lodestone developers";

/// Drive the engine over the UCI protocol on stdin/stdout. Protocol errors
/// (unknown commands, wrong argument counts) are fatal session errors and
/// end the loop.
pub fn uci_loop(engine: &mut Engine) -> Result<(), String> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut infinite_search = false;

    for line in stdin.lock().lines() {
        let line = line.map_err(|e| format!("Failed to read stdin: {}", e))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let Some(&command) = tokens.first() else {
            continue;
        };

        match command {
            "uci" => {
                if tokens.len() > 1 {
                    return Err("Unexpected argument to command uci".to_string());
                }
                println!("id name {}", ENGINE_NAME);
                println!("id author {}", ENGINE_AUTHOR);
                println!("uciok");
            }
            "debug" => match tokens.as_slice() {
                ["debug", "on"] => {}
                ["debug", "off"] => {}
                _ => return Err("Unexpected argument to command debug".to_string()),
            },
            "isready" => {
                initialize_attack_tables();
                println!("readyok");
            }
            "setoption" => {
                return Err("Unrecognized option in setoption".to_string());
            }
            "register" => {
                return Err("No registration requested".to_string());
            }
            "ucinewgame" => {
                engine.new_game();
            }
            "position" => {
                parse_position_command(engine, &tokens)?;
            }
            "go" => {
                let (limits, infinite) = parse_go_command(engine, &tokens)?;
                infinite_search = infinite;
                engine.go(limits);

                if !infinite {
                    let (_, best_move) = engine.wait()?;
                    println!("bestmove {}", best_move.to_uci_string());
                }
            }
            "stop" => {
                if infinite_search {
                    infinite_search = false;
                    let (_, best_move) = engine.stop()?;
                    println!("bestmove {}", best_move.to_uci_string());
                }
            }
            "ponderhit" => {
                // Pondering is the front-end driver's concern
            }
            "quit" => break,
            other => {
                return Err(format!("Unrecognized command: {}", other));
            }
        }

        stdout.flush().map_err(|e| format!("Failed to flush stdout: {}", e))?;
    }

    Ok(())
}

/// Parse a position command:
///   position startpos [moves ...]
///   position fen <6 fields> [moves ...]
fn parse_position_command(engine: &mut Engine, tokens: &[&str]) -> Result<(), String> {
    if tokens.len() < 2 {
        return Err("Not enough arguments to command position".to_string());
    }

    let mut index;

    match tokens[1] {
        "startpos" => {
            engine.game_state = GameState::new();
            index = 2;
        }
        "fen" => {
            if tokens.len() < 3 {
                return Err("Expected FEN string after position fen".to_string());
            }

            index = 2;
            let mut fen_fields = Vec::new();
            while index < tokens.len() && tokens[index] != "moves" {
                fen_fields.push(tokens[index]);
                index += 1;
            }

            engine.game_state = GameState::from_fen(&fen_fields.join(" "))?;
        }
        other => return Err(format!("Unknown position type: {}", other)),
    }

    if index < tokens.len() {
        if tokens[index] != "moves" {
            return Err("Unrecognized arguments to command position".to_string());
        }

        for move_str in &tokens[index + 1..] {
            engine.make_uci_move(move_str)?;
        }
    }

    Ok(())
}

/// Parse a go command into search limits. The clock fields are accepted and
/// ignored; `infinite` defers the best-move report until `stop`.
fn parse_go_command(engine: &Engine, tokens: &[&str]) -> Result<(SearchLimits, bool), String> {
    let mut limits = SearchLimits::default();
    let mut infinite = false;

    let mut index = 1;
    while index < tokens.len() {
        match tokens[index] {
            "searchmoves" => {
                let mut moves = Vec::new();
                while index + 1 < tokens.len() {
                    let Ok(m) = engine.game_state.convert_move(tokens[index + 1]) else {
                        break;
                    };
                    moves.push(m);
                    index += 1;
                }

                if moves.is_empty() {
                    return Err("No legal moves given to searchmoves".to_string());
                }
                limits.moves = Some(moves);
            }
            "depth" => {
                limits.depth_limit = Some(parse_value(tokens, index)?);
                index += 1;
            }
            "nodes" => {
                limits.node_limit = Some(parse_value(tokens, index)?);
                index += 1;
            }
            "mate" => {
                limits.mate_in = Some(parse_value(tokens, index)?);
                index += 1;
            }
            "movetime" => {
                limits.timeout_ms = Some(parse_value(tokens, index)?);
                index += 1;
            }
            "infinite" => {
                infinite = true;
            }
            "ponder" => {
                // Treated like infinite: the driver decides when to stop
                infinite = true;
            }
            "wtime" | "btime" | "winc" | "binc" | "movestogo" => {
                // Clock management is not implemented; skip the value
                index += 1;
            }
            other => {
                return Err(format!("Unrecognized argument to command go: {}", other));
            }
        }

        index += 1;
    }

    Ok((limits, infinite))
}

fn parse_value<T: std::str::FromStr>(tokens: &[&str], index: usize) -> Result<T, String> {
    tokens
        .get(index + 1)
        .and_then(|value| value.parse::<T>().ok())
        .ok_or_else(|| format!("Expected a number after go {}", tokens[index]))
}
