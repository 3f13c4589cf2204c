use std::path::PathBuf;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::core::error::{AppError, AppResult};
use crate::modules::receipts::models::Receipt;

/// Renders a receipt to a one-page PDF and writes it under `base_dir`,
/// returning the local path and byte size. Pure with respect to the
/// database — callers own persisting `pdf_generated`/`pdf_local_path`.
pub fn render_receipt_pdf(receipt: &Receipt, base_dir: &str) -> AppResult<(PathBuf, i64)> {
    let (doc, page1, layer1) = PdfDocument::new(
        &receipt.receipt_number,
        Mm(210.0),
        Mm(297.0),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::internal(format!("failed to load pdf font: {e}")))?;

    let mut y = Mm(270.0);
    let mut write_line = |text: &str, size: f64, y: &mut Mm| {
        layer.use_text(text, size, Mm(20.0), *y, &font);
        *y = Mm(y.0 - 8.0);
    };

    write_line("RECEIPT", 18.0, &mut y);
    write_line(&format!("Receipt #: {}", receipt.receipt_number), 11.0, &mut y);
    write_line(&format!("Paid at: {}", receipt.paid_at.to_rfc3339()), 11.0, &mut y);
    write_line(
        &format!("Amount: {} {}", receipt.amount, receipt.currency),
        11.0,
        &mut y,
    );
    write_line(&format!("Billed to: {}", receipt.email_recipient), 11.0, &mut y);

    if let Some(order_number) = receipt.order_snapshot.get("order_number").and_then(|v| v.as_str()) {
        write_line(&format!("Order #: {order_number}"), 11.0, &mut y);
    }
    if let Some(items) = receipt.order_snapshot.get("items").and_then(|v| v.as_array()) {
        write_line(&format!("{} line item(s)", items.len()), 11.0, &mut y);
    }

    std::fs::create_dir_all(base_dir)
        .map_err(|e| AppError::internal(format!("failed to create receipts directory: {e}")))?;

    let path = PathBuf::from(base_dir).join(format!("{}.pdf", receipt.id));
    let file = std::fs::File::create(&path)
        .map_err(|e| AppError::internal(format!("failed to create receipt pdf file: {e}")))?;
    let mut writer = std::io::BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| AppError::internal(format!("failed to write receipt pdf: {e}")))?;
    drop(writer);

    let size_bytes = std::fs::metadata(&path)
        .map_err(|e| AppError::internal(format!("failed to stat receipt pdf: {e}")))?
        .len() as i64;

    Ok((path, size_bytes))
}
