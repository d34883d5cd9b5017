use picosh::Interpreter;

fn main() -> anyhow::Result<()> {
    Interpreter::default().repl()
}
