fn main() {
    reqpilot_lib::run()
}
