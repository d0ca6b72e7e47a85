use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Runs a jq filter over one document and parses every output back into JSON.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| {
            let reasons: Vec<String> = errs.into_iter().map(|(_, err)| format!("{err:?}")).collect();
            anyhow!("{}", reasons.join("; "))
        })
        .with_context(|| format!("failed to parse jq filter `{filter_src}`"))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            let names: Vec<&str> = errs
                .into_iter()
                .flat_map(|(_, undefined)| undefined.into_iter().map(|(name, _)| name))
                .collect();
            anyhow!("undefined: {}", names.join(", "))
        })
        .with_context(|| format!("failed to compile jq filter `{filter_src}`"))?;

    let inputs = RcIter::new(core::iter::empty());
    let mut it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    while let Some(item) = it.next() {
        let v = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        let text = format!("{v}"); // Val: Display -> JSON text
        let value = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("jq produced a non-JSON value: {text}"))?;
        out.push(value);
    }
    Ok(out)
}
