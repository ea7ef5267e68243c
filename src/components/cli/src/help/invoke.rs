use super::HelpCommand;
use crate::Invoke;
use indoc::indoc;

impl Invoke for HelpCommand {
    fn invoke(self) -> Result<(), ()> {
        print!(indoc! {"
            usage: katal [OPTIONS] FILENAME

            options:
              -I DIR                    Add DIR to the include search list
              -D NAME[=VALUE]           Predefine the macro NAME
              -o FILENAME               Write output to FILENAME instead of stdout
              --max-include-depth N     Limit #include nesting to N levels
              --strip-comments          Accepted, has no effect
              --strip-whitespace        Accepted, has no effect
              --tokens                  Print the tokens of the output, one per line
        "});
        Err(())
    }
}
