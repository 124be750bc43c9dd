use lodestone::attacks::initialize_attack_tables;
use lodestone::engine::Engine;
use lodestone::uci::uci_loop;

fn main() {
    initialize_attack_tables();

    let mut engine = Engine::new();

    if let Err(e) = uci_loop(&mut engine) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
