use std::process;

use ecommerce_eda::{application::the_app, events::PassEvent};

fn main() {
    match the_app() {
        Ok(PassEvent::AwaitingInput) => println!("{}", PassEvent::AwaitingInput),
        Ok(event @ PassEvent::PassComplete { .. }) => println!("{event}"),
        Err(err) => {
            eprintln!("{}", err.failure_message());
            process::exit(1);
        }
    }
}
