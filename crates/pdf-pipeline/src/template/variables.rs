//! Built-in template variables

use super::context::{TemplateContext, Value, Variable};
use chrono::Local;
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::Path;

pub const DATE: &str = "date";
pub const TIME: &str = "time";
pub const DATETIME: &str = "datetime";

pub const RAND: &str = "rand";
pub const RAND_STR: &str = "randstr";
pub const UUID: &str = "uuid";

pub const CWD: &str = "cwd";
pub const INPUT_FILENAME: &str = "infile";
pub const INPUT_DIR: &str = "indir";
pub const TOTAL: &str = "total";
pub const CURRENT_INDEX: &str = "index";
pub const CURRENT_PAGE: &str = "page";
/// 1-based page number in the source document, which may repeat or run backwards
pub const SOURCE_PAGE: &str = "pageno";

/// Context keys that tune the random variables
pub const MIN_RAND_NUM: &str = "MIN_RAND_NUM";
pub const MAX_RAND_NUM: &str = "MAX_RAND_NUM";
pub const RAND_STR_LEN: &str = "RAND_STR_LEN";
pub const RAND_STR_CHARS: &str = "RAND_STR_CHARS";

pub const DEFAULT_MIN_RAND_NUM: i64 = 0;
pub const DEFAULT_MAX_RAND_NUM: i64 = i64::MAX;
pub const DEFAULT_RAND_STR_LEN: usize = 16;
pub const MAX_RAND_STR_LEN: usize = 256;
pub const DEFAULT_RAND_STR_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `$date`, `$time` and `$datetime`
pub fn datetime_variables() -> Vec<(String, Variable)> {
    vec![
        (
            DATE.to_string(),
            Variable::resolver(|| Local::now().format("%Y-%m-%d").to_string().into()),
        ),
        (
            TIME.to_string(),
            Variable::resolver(|| Local::now().format("%H%M%S").to_string().into()),
        ),
        (
            DATETIME.to_string(),
            Variable::resolver(|| Local::now().format("%Y-%m-%d-%H%M%S").to_string().into()),
        ),
    ]
}

/// `$rand`, `$randstr` and `$uuid`
pub fn random_variables() -> Vec<(String, Variable)> {
    vec![
        (RAND.to_string(), Variable::context_resolver(rand_num)),
        (RAND_STR.to_string(), Variable::context_resolver(rand_str)),
        (
            UUID.to_string(),
            Variable::resolver(|| uuid::Uuid::new_v4().simple().to_string().into()),
        ),
    ]
}

/// Run-scoped variables describing the input file and the item count.
///
/// `$index` and `$page` start at zero and one; drivers update them per item.
pub fn runtime_variables(input_file: Option<&Path>, total: usize) -> Vec<(String, Variable)> {
    let mut vars = vec![
        (TOTAL.to_string(), Variable::from(total)),
        (CURRENT_INDEX.to_string(), Variable::from(0usize)),
        (CURRENT_PAGE.to_string(), Variable::from(1usize)),
    ];

    if let Ok(cwd) = std::env::current_dir() {
        vars.push((CWD.to_string(), Variable::from(cwd.as_path())));
    }

    if let Some(input) = input_file {
        if let Some(name) = input.file_name() {
            vars.push((
                INPUT_FILENAME.to_string(),
                Variable::from(name.to_string_lossy().into_owned()),
            ));
        }
        let absolute = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
        if let Some(parent) = absolute.parent() {
            vars.push((INPUT_DIR.to_string(), Variable::from(parent)));
        }
    }

    vars
}

/// A context holding every built-in family
pub fn builtin_context(input_file: Option<&Path>, total: usize) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    ctx.extend(datetime_variables());
    ctx.extend(random_variables());
    ctx.extend(runtime_variables(input_file, total));
    ctx
}

fn rand_num(ctx: &TemplateContext) -> Value {
    let mut min = ctx.literal_int(MIN_RAND_NUM).unwrap_or(DEFAULT_MIN_RAND_NUM);
    let mut max = ctx.literal_int(MAX_RAND_NUM).unwrap_or(DEFAULT_MAX_RAND_NUM);
    if max < min {
        std::mem::swap(&mut min, &mut max);
    }
    Value::Int(rand::thread_rng().gen_range(min..=max))
}

fn rand_str(ctx: &TemplateContext) -> Value {
    let len = ctx
        .literal_int(RAND_STR_LEN)
        .map(|n| n.clamp(1, MAX_RAND_STR_LEN as i64) as usize)
        .unwrap_or(DEFAULT_RAND_STR_LEN);

    let alphabet: Vec<char> = ctx
        .literal_text(RAND_STR_CHARS)
        .filter(|chars| !chars.is_empty())
        .unwrap_or(DEFAULT_RAND_STR_CHARS)
        .chars()
        .collect();

    let mut rng = rand::thread_rng();
    let s: String = (0..len)
        .filter_map(|_| alphabet.choose(&mut rng).copied())
        .collect();
    Value::Text(s)
}
