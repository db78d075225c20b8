fn main() {
    mutsu::init();
    mutsu::uci::uci_loop();
}
