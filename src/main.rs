fn main() -> anyhow::Result<()> {
    takeout_converter_lib::run()
}
