//! Prompt text sent to the generation service on a cache miss.

use crate::identity::IdentityDescriptor;

/// Renders generation requests from identities.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the prompt for one function.
    ///
    /// Pure: the same identity always yields the same text.
    pub fn build(identity: &IdentityDescriptor) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are a vibescript programmer. ");
        prompt.push_str(
            "Write the implementation of the function whose signature is provided below.\n\n",
        );

        prompt.push_str("## vibescript\n");
        prompt.push_str(LANGUAGE_REFERENCE);
        prompt.push('\n');

        if !identity.custom_types.is_empty() {
            prompt.push_str("## Custom types\n");
            prompt.push_str("The function is using the following custom types:\n\n");
            let types: Vec<&str> = identity.custom_types.iter().map(String::as_str).collect();
            prompt.push_str(&types.join("\n\n"));
            prompt.push_str("\n\n");
            prompt.push_str(
                "These types are defined elsewhere. Do not include their definitions in your code. \
                 Values of these types are maps; read their fields with `value.field`.\n\n",
            );
        }

        if !identity.context.trim().is_empty() {
            prompt.push_str("## Execution context\n");
            prompt.push_str(
                "The function runs in a module that already contains the following code. \
                 You may call anything it defines.\n\n",
            );
            prompt.push_str("```vibescript\n");
            prompt.push_str(identity.context.trim_end());
            prompt.push_str("\n```\n\n");
        }

        prompt.push_str("## Function to implement\n");
        prompt.push_str(&identity.header());
        prompt.push_str("\n\nDocstring:\n");
        prompt.push_str(&identity.docstring);
        prompt.push_str("\n\n");

        prompt.push_str(&format!(
            "Include only the definition of `{}`, exactly one function, in a single \
             ```vibescript code block. Do not explain it.\n",
            identity.name
        ));

        prompt
    }
}

const LANGUAGE_REFERENCE: &str = "\
- Functions: `fn name(a, b = 1) { ... }`; type annotations `a: int` and `-> int` are optional.
- Variables: `let x = 1;` then `x = x + 1;` or `x += 1;`. Semicolons are optional.
- Values: nil, true/false, int, float, \"string\", [list], {\"key\": value} maps. \
Map keys are strings, ints or bools.
- Control flow: `if c { } else if d { } else { }`, `while c { }`, `for x in xs { }`, \
`for i in range(0, n) { }`, `break`, `continue`, `return value`.
- Operators: + - * / % == != < <= > >= && || ! (also `and`, `or`, `not`). \
Integer `/` and `%` floor like Python's `//` and `%`; `/` with a float operand is float division.
- Indexing: `xs[0]`, `m[\"key\"]`, fields `m.key`; negative list indices count from the end. \
A missing key is an error; use `get(m, key, default)`.
- Builtins: len range str int float abs min max push pop insert remove keys values contains \
join split upper lower trim starts_with ends_with replace sqrt pow floor ceil round sum sorted \
reversed type_of print get slice. Method syntax `xs.push(1)` calls `push(xs, 1)`.
- `remove(xs, i)` removes by index, `remove(m, key)` by key. `slice(xs, start, end)` copies a range.
- Lists and maps are shared by reference; `push`, `pop`, `insert` and `remove` modify in place.
- Only `fn` and `let` may appear at the top level.
";
