mod bench;
mod eval;
mod position;
mod search;
mod types;
mod usi;

use std::env;

fn main() {
    env_logger::init();

    if env::args().any(|x| x == *"bench") {
        bench::bench();
    } else {
        usi::main_loop();
    }
}
