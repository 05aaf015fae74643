use crate::domain::model::{Artifact, RegressionModel};

pub const MAGIC: &[u8; 4] = b"HGRM";
pub const FORMAT_VERSION: u32 = 1;
const BYTES_PER_LINE: usize = 12;

/// Packs a model little-endian: magic, version, feature count, floor,
/// intercept, then the mean, scale and coefficient tables as `f32`.
pub fn encode_model(model: &RegressionModel) -> Vec<u8> {
    let n = model.n_features();
    let mut out = Vec::with_capacity(20 + 12 * n);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(n as u32).to_le_bytes());
    out.extend_from_slice(&(model.min_prediction_seconds as f32).to_le_bytes());
    out.extend_from_slice(&(model.intercept as f32).to_le_bytes());
    for table in [&model.means, &model.scales, &model.coefficients] {
        for value in table {
            out.extend_from_slice(&(*value as f32).to_le_bytes());
        }
    }

    out
}

pub fn render_byte_array(var_name: &str, bytes: &[u8]) -> String {
    let guard = format!("{}_H", var_name.to_uppercase());
    let body = bytes
        .chunks(BYTES_PER_LINE)
        .map(|line| {
            line.iter()
                .map(|b| format!("0x{:02x}", b))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join(",\n  ");

    format!(
        "#ifndef {guard}\n#define {guard}\n\n\
         alignas(8) const unsigned char {var}_bin[] = {{\n  {body}\n}};\n\n\
         const unsigned int {var}_bin_len = {len};\n\n#endif\n",
        guard = guard,
        var = var_name,
        body = body,
        len = bytes.len(),
    )
}

pub fn render_blob(model: &RegressionModel, name: &str) -> Artifact {
    let var_name = format!("{}_model", name);
    Artifact {
        filename: format!("{}.h", var_name),
        contents: render_byte_array(&var_name, &encode_model(model)),
    }
}
