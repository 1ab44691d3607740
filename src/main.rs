fn main() {
    broker_stack::app::cli::run();
}
