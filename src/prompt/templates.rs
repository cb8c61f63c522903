//! Built-in prompt templates.

pub const SYSTEM: &str = "You are a careful programmer. You answer with exactly one fenced {{language}} code block \
containing a complete program that runs as-is. Do not put explanations inside the code block.";

pub const INITIAL: &str = r#"Implement a {{language}} script in a single code block to perform this task:

{{description}}

Requirements:
- Return the complete program in one ```{{fence}} fenced block.
- The program must run directly with no arguments, input or missing pieces.
- Do not mix prose into the code block."#;

pub const MODIFY: &str = r#"Modify the following {{language}} code:

```{{fence}}
{{existing_code}}
```

Requested change:

{{instruction}}

Requirements:
- Return the complete modified program in one ```{{fence}} fenced block.
- The program must run directly with no arguments, input or missing pieces.
- Do not mix prose into the code block."#;

pub const CORRECTION: &str = r#"The original request was:

{{request}}

Here is the code:

```{{fence}}
{{previous_code}}
```

Running it failed with {{error_kind}}:

{{error_message}}
{{#if error_detail}}

Full error output:

```
{{error_detail}}
```
{{/if}}

Fix the error. Return the full corrected program (not a diff or a fragment) in one ```{{fence}} fenced block."#;
