use crate::domain::model::{Artifact, RegressionModel};

/// Shortest literal that round-trips the `f32`, with a C float suffix.
pub fn c_float(value: f64) -> String {
    format!("{:?}f", value as f32)
}

fn c_array(values: &[f64]) -> String {
    values.iter().map(|v| c_float(*v)).collect::<Vec<_>>().join(", ")
}

/// Renders `<name>_model.h` with declarations and `<name>_model.cpp` with
/// the table definitions.
pub fn render_tables(model: &RegressionModel, name: &str) -> Vec<Artifact> {
    let n = model.n_features();
    let guard = format!("{}_MODEL_H", name.to_uppercase());
    let header_name = format!("{}_model.h", name);

    let mut header = format!(
        "#ifndef {guard}\n#define {guard}\n\n#include <array>\n\n\
         // Features: {features}\n\
         const int {name}_N_FEATURES = {n};\n\
         const int {name}_N_OUTPUTS = 1;\n\
         const float {name}_MIN_PREDICTION = {min};\n\n",
        guard = guard,
        features = model.feature_names.join(", "),
        name = name,
        n = n,
        min = c_float(model.min_prediction_seconds),
    );
    for table in ["mean", "scale", "coef"] {
        header.push_str(&format!(
            "extern const std::array<float, {}> {}_{};\n",
            n, name, table
        ));
    }
    header.push_str(&format!("extern const float {}_intercept;\n\n#endif\n", name));

    let mut source = format!("#include \"{}\"\n\n", header_name);
    for (table, values) in [
        ("mean", &model.means),
        ("scale", &model.scales),
        ("coef", &model.coefficients),
    ] {
        source.push_str(&format!(
            "const std::array<float, {}> {}_{} = {{{}}};\n",
            n,
            name,
            table,
            c_array(values)
        ));
    }
    source.push_str(&format!(
        "const float {}_intercept = {};\n",
        name,
        c_float(model.intercept)
    ));

    vec![
        Artifact {
            filename: header_name,
            contents: header,
        },
        Artifact {
            filename: format!("{}_model.cpp", name),
            contents: source,
        },
    ]
}
